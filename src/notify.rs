use std::sync::Arc;

use serde_json::json;

const MAIL_SEND_URL: &str = "https://api.sendgrid.com/v3/mail/send";

/// Outbound email, best effort. Without an API key the notifier runs in
/// log-only mode: deliveries are recorded in the log and reported as sent.
pub struct Notifier {
    http: reqwest::Client,
    api_key: Option<String>,
    sender: String,
}

impl Notifier {
    pub fn new(api_key: Option<String>, sender: String) -> Self {
        if api_key.is_none() {
            log::warn!("SENDGRID_API_KEY not set; outbound email is log-only");
        }
        Self {
            http: reqwest::Client::new(),
            api_key,
            sender,
        }
    }

    pub async fn send(&self, to: &str, subject: &str, html_body: &str) -> anyhow::Result<()> {
        let api_key = match &self.api_key {
            Some(key) => key,
            None => {
                log::info!("Would have sent `{}` to {}", subject, to);
                return Ok(());
            }
        };

        let body = json!({
            "personalizations": [{ "to": [{ "email": to }] }],
            "from": { "email": self.sender },
            "subject": subject,
            "content": [{ "type": "text/html", "value": html_body }],
        });
        let response = self
            .http
            .post(MAIL_SEND_URL)
            .bearer_auth(api_key)
            .json(&body)
            .send()
            .await?;
        if response.status() != reqwest::StatusCode::ACCEPTED {
            anyhow::bail!("mail API answered {}", response.status());
        }
        Ok(())
    }

    /// Hands the delivery to a detached task. The submission that triggered
    /// it has already been persisted and answered; a failed send is only
    /// logged.
    pub fn dispatch(self: &Arc<Self>, to: String, subject: String, html_body: String) {
        let notifier = Arc::clone(self);
        tokio::spawn(async move {
            if let Err(err) = notifier.send(&to, &subject, &html_body).await {
                log::error!("Email send error: {}", err);
            }
        });
    }
}

pub fn registration_confirmation(full_name: &str, program: &str) -> (String, String) {
    let subject =
        "Registration Confirmation - Word of Hope International Bible College".to_string();
    let html = format!(
        r#"<html>
    <body style="font-family: Arial, sans-serif; line-height: 1.6; color: #333;">
        <div style="max-width: 600px; margin: 0 auto; padding: 20px;">
            <h2 style="color: #1e4a72; text-align: center;">Word of Hope International Bible College</h2>
            <h3 style="color: #2e7d32;">Registration Confirmation</h3>

            <p>Dear {full_name},</p>

            <p>Thank you for your registration with Word of Hope International Bible College. We have successfully received your application for the <strong>{program}</strong> program.</p>

            <div style="background-color: #f5f5f5; padding: 15px; border-left: 4px solid #1e4a72; margin: 20px 0;">
                <h4 style="margin-top: 0; color: #1e4a72;">What's Next?</h4>
                <ul>
                    <li>Our admissions team will review your application</li>
                    <li>You will receive further instructions within 3-5 business days</li>
                    <li>Please prepare any additional documents that may be required</li>
                </ul>
            </div>

            <p><strong>Our Motto:</strong> Excellence in Academic and Character</p>

            <p>For any questions, please contact us:</p>
            <ul>
                <li>Email: wohibc2025@gmail.com</li>
                <li>Phone: +2349042520176 / +2349157788318</li>
            </ul>

            <p>Blessings,<br>
            <strong>Word of Hope International Bible College<br>
            Admissions Office</strong></p>

            <hr style="margin: 30px 0; border: none; border-top: 1px solid #ddd;">
            <p style="font-size: 12px; color: #666; text-align: center;">
                Affiliated with Triumphant Christian University of America<br>
                Canada Address: 200 Bay Street South Apartment, 814 Hamilton, Ontario L8P 4S4<br>
                Nigeria Study Centre: Life Giving Word Mission Inc., 37 Amuri Road Achakpa, Abakpa, Enugu State
            </p>
        </div>
    </body>
</html>"#
    );
    (subject, html)
}

pub fn partnership_acknowledgment(organization: &str, partnership_type: &str) -> (String, String) {
    let subject =
        "Partnership Application Received - Word of Hope International Bible College".to_string();
    let html = format!(
        r#"<html>
    <body style="font-family: Arial, sans-serif; line-height: 1.6; color: #333;">
        <div style="max-width: 600px; margin: 0 auto; padding: 20px;">
            <h2 style="color: #1e4a72; text-align: center;">Word of Hope International Bible College</h2>
            <h3 style="color: #2e7d32;">Partnership Application Received</h3>

            <p>Dear Partner,</p>

            <p>Thank you for your interest in partnering with Word of Hope International Bible College. We have received your application for <strong>{partnership_type}</strong> from <strong>{organization}</strong>.</p>

            <div style="background-color: #f5f5f5; padding: 15px; border-left: 4px solid #2e7d32; margin: 20px 0;">
                <h4 style="margin-top: 0; color: #2e7d32;">Partnership Vision</h4>
                <p>Together, we are committed to advancing research, policy formation, and training of Christian leaders at national and global levels.</p>
            </div>

            <p>Our partnership team will review your application and contact you within 5-7 business days to discuss next steps.</p>

            <p>For immediate questions, please contact us:</p>
            <ul>
                <li>Email: wohibc2025@gmail.com</li>
                <li>Phone: +2349042520176 / +2349157788318</li>
            </ul>

            <p>Blessings,<br>
            <strong>Word of Hope International Bible College<br>
            Partnership Development Team</strong></p>

            <hr style="margin: 30px 0; border: none; border-top: 1px solid #ddd;">
            <p style="font-size: 12px; color: #666; text-align: center;">
                Excellence in Academic and Character<br>
                Affiliated with Triumphant Christian University of America
            </p>
        </div>
    </body>
</html>"#
    );
    (subject, html)
}
