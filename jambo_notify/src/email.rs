use async_trait::async_trait;
use jambo_core::{EscalationNotice, Notifier};
use lettre::message::Mailbox;
use lettre::message::header::ContentType;
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};
use tracing::debug;

#[derive(Debug, Clone)]
pub struct EmailSettings {
    pub smtp_host: String,
    pub smtp_port: u16,
    pub username: String,
    pub password: String,
    pub from: String,
    pub to: Vec<String>,
}

/// Mails the lead to the sales inbox over STARTTLS SMTP.
pub struct EmailNotifier {
    mailer: AsyncSmtpTransport<Tokio1Executor>,
    from: Mailbox,
    to: Vec<Mailbox>,
}

impl EmailNotifier {
    pub fn new(settings: &EmailSettings) -> anyhow::Result<Self> {
        let from: Mailbox = settings.from.parse()?;
        let to = settings
            .to
            .iter()
            .map(|address| address.parse::<Mailbox>())
            .collect::<Result<Vec<_>, _>>()?;
        if to.is_empty() {
            anyhow::bail!("email notification needs at least one recipient");
        }

        let mut builder = AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&settings.smtp_host)?
            .port(settings.smtp_port);
        if !settings.username.is_empty() {
            builder = builder.credentials(Credentials::new(
                settings.username.clone(),
                settings.password.clone(),
            ));
        }

        Ok(Self {
            mailer: builder.build(),
            from,
            to,
        })
    }

    pub fn message(&self, notice: &EscalationNotice) -> anyhow::Result<Message> {
        let mut builder = Message::builder()
            .from(self.from.clone())
            .subject(notice.subject())
            .header(ContentType::TEXT_PLAIN);
        for recipient in &self.to {
            builder = builder.to(recipient.clone());
        }
        Ok(builder.body(notice.render_text())?)
    }
}

#[async_trait]
impl Notifier for EmailNotifier {
    async fn notify(&self, notice: &EscalationNotice) -> anyhow::Result<()> {
        let message = self.message(notice)?;
        self.mailer.send(message).await?;
        debug!("Emailed lead for {} to {} recipients", notice.contact_address, self.to.len());
        Ok(())
    }
}
