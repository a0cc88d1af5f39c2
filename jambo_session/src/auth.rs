use qrcode::QrCode;
use qrcode::render::unicode::Dense1x2;
use tracing::{info, warn};

/// Where authentication codes are shown to the operator.
pub trait AuthCodeSink: Send + Sync {
    fn show(&self, code: &str);
}

/// Logs the raw code only.
pub struct LogAuthSink;

impl AuthCodeSink for LogAuthSink {
    fn show(&self, code: &str) {
        info!("Authentication code received: {code}");
    }
}

/// Renders the code as a QR block on the terminal for scanning with the
/// phone app, and logs it.
pub struct TerminalQrSink;

impl TerminalQrSink {
    #[must_use]
    pub fn render(code: &str) -> Option<String> {
        match QrCode::new(code.as_bytes()) {
            Ok(qr) => Some(
                qr.render::<Dense1x2>()
                    .dark_color(Dense1x2::Light)
                    .light_color(Dense1x2::Dark)
                    .quiet_zone(true)
                    .build(),
            ),
            Err(e) => {
                warn!("Failed to render authentication code as QR: {e}");
                None
            }
        }
    }
}

impl AuthCodeSink for TerminalQrSink {
    fn show(&self, code: &str) {
        info!("Scan the code below to link this device");
        if let Some(rendered) = Self::render(code) {
            println!("\n{rendered}\n");
        } else {
            println!("Authentication code: {code}");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn renders_a_block() {
        let rendered = TerminalQrSink::render("2@abc,def,ghi");
        assert!(rendered.is_some_and(|r| r.lines().count() > 10));
    }
}
