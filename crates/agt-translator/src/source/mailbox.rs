//! IMAP mailbox source.
//!
//! `RockBLOCK` forwards every MO message as an e-mail with the binary
//! payload attached as `<imei>-<momsn>.sbd`. This source searches the
//! configured mailbox for such mails and extracts their attachments.

use std::io::{Read, Write};
use std::path::Path;

use async_trait::async_trait;
use mailparse::{MailHeaderMap, ParsedMail};
use tracing::{debug, info, warn};

use super::{MessageSource, RawMessage};
use crate::config::EmailSettings;
use crate::error::{Error, Result};

/// Attachment extensions that carry binary messages.
const MESSAGE_EXTENSIONS: &[&str] = &["sbd", "bin"];

/// Messages delivered as e-mail attachments to an IMAP mailbox.
#[derive(Debug, Clone)]
pub struct MailboxSource {
    settings: EmailSettings,
    unseen_only: bool,
}

impl MailboxSource {
    /// Create a mailbox source.
    ///
    /// With `unseen_only`, mails already marked as read are skipped.
    /// Fetching marks the retrieved mails as read.
    #[must_use]
    pub fn new(settings: EmailSettings, unseen_only: bool) -> Self {
        Self {
            settings,
            unseen_only,
        }
    }
}

#[async_trait]
impl MessageSource for MailboxSource {
    fn name(&self) -> &'static str {
        "mailbox"
    }

    async fn fetch(&mut self) -> Result<Vec<RawMessage>> {
        let settings = self.settings.clone();
        let unseen_only = self.unseen_only;
        let mails = tokio::task::spawn_blocking(move || fetch_mails(&settings, unseen_only))
            .await
            .map_err(|e| Error::internal(format!("mailbox task failed: {e}")))??;

        let mut messages = Vec::new();
        for (seq, raw_mail) in mails {
            match extract_attachments(&raw_mail) {
                Ok(attachments) => {
                    for (filename, bytes) in attachments {
                        messages.push(RawMessage {
                            origin: format!("mail #{seq}: {filename}"),
                            bytes,
                        });
                    }
                }
                Err(e) => warn!("Skipping mail #{}: {}", seq, e),
            }
        }
        info!("Retrieved {} message attachments", messages.len());
        Ok(messages)
    }
}

/// IMAP SEARCH query for mails from `from`, optionally only unread ones.
#[must_use]
pub fn search_query(from: &str, unseen_only: bool) -> String {
    let escaped = from.replace('\\', "\\\\").replace('"', "\\\"");
    if unseen_only {
        format!("FROM \"{escaped}\" UNSEEN")
    } else {
        format!("FROM \"{escaped}\"")
    }
}

/// The IMAP commands used after login.
trait MailSession {
    fn select_mailbox(&mut self, mailbox: &str) -> Result<()>;
    fn search_sequence(&mut self, query: &str) -> Result<Vec<u32>>;
    fn fetch_rfc822(&mut self, seq: u32) -> Result<Vec<Vec<u8>>>;
    fn close(&mut self) -> Result<()>;
}

impl<T: Read + Write> MailSession for imap::Session<T> {
    fn select_mailbox(&mut self, mailbox: &str) -> Result<()> {
        self.select(mailbox)
            .map(|_| ())
            .map_err(|e| Error::mailbox(format!("cannot select {mailbox}: {e}")))
    }

    fn search_sequence(&mut self, query: &str) -> Result<Vec<u32>> {
        self.search(query)
            .map(|hits| hits.into_iter().collect())
            .map_err(|e| Error::mailbox(format!("search failed: {e}")))
    }

    fn fetch_rfc822(&mut self, seq: u32) -> Result<Vec<Vec<u8>>> {
        let fetches = self
            .fetch(seq.to_string(), "RFC822")
            .map_err(|e| Error::mailbox(format!("fetching mail #{seq} failed: {e}")))?;
        Ok(fetches
            .iter()
            .filter_map(|fetch| fetch.body().map(<[u8]>::to_vec))
            .collect())
    }

    fn close(&mut self) -> Result<()> {
        imap::Session::logout(self).map_err(|e| Error::mailbox(format!("logout failed: {e}")))
    }
}

/// Log in, search and download matching mails as raw RFC 822 bytes.
fn fetch_mails(settings: &EmailSettings, unseen_only: bool) -> Result<Vec<(u32, Vec<u8>)>> {
    let tls = native_tls::TlsConnector::builder()
        .build()
        .map_err(|e| Error::mailbox(format!("TLS setup failed: {e}")))?;

    info!("Connecting to {}:{} ...", settings.host, settings.port);
    let client = imap::connect(
        (settings.host.as_str(), settings.port),
        settings.host.as_str(),
        &tls,
    )
    .map_err(|e| Error::mailbox(format!("connection to {} failed: {e}", settings.host)))?;

    let mut session = client
        .login(&settings.user, &settings.password)
        .map_err(|(e, _client)| Error::mailbox(format!("login failed: {e}")))?;

    let query = search_query(&settings.from, unseen_only);
    download(&mut session, &settings.mailbox, &query)
}

/// Download all mails matching `query`, logging out afterwards even if a
/// command failed.
fn download(
    session: &mut impl MailSession,
    mailbox: &str,
    query: &str,
) -> Result<Vec<(u32, Vec<u8>)>> {
    let result = download_selected(session, mailbox, query);
    if let Err(e) = session.close() {
        warn!("IMAP {}", e);
    }
    result
}

fn download_selected(
    session: &mut impl MailSession,
    mailbox: &str,
    query: &str,
) -> Result<Vec<(u32, Vec<u8>)>> {
    session.select_mailbox(mailbox)?;

    let mut sequence = session.search_sequence(query)?;
    sequence.sort_unstable();
    debug!("Search '{}' matched {} mails", query, sequence.len());

    let mut mails = Vec::with_capacity(sequence.len());
    for seq in sequence {
        for body in session.fetch_rfc822(seq)? {
            mails.push((seq, body));
        }
    }
    Ok(mails)
}

/// Extract binary message attachments from a raw e-mail.
///
/// Returns `(file name, content)` pairs for every attachment whose file
/// name ends in `.sbd` or `.bin`. Other attachments are skipped with a
/// warning.
///
/// # Errors
///
/// Returns an error if the mail cannot be parsed or an attachment cannot
/// be decoded.
pub fn extract_attachments(raw_mail: &[u8]) -> Result<Vec<(String, Vec<u8>)>> {
    let mail = mailparse::parse_mail(raw_mail)?;
    let mut found = Vec::new();
    collect_attachments(&mail, &mut found)?;
    Ok(found)
}

fn collect_attachments(part: &ParsedMail<'_>, found: &mut Vec<(String, Vec<u8>)>) -> Result<()> {
    if part.ctype.mimetype.starts_with("multipart/") {
        for sub in &part.subparts {
            collect_attachments(sub, found)?;
        }
        return Ok(());
    }
    if part.headers.get_first_value("Content-Disposition").is_none() {
        return Ok(());
    }

    let disposition = part.get_content_disposition();
    let Some(filename) = disposition
        .params
        .get("filename")
        .or_else(|| part.ctype.params.get("name"))
    else {
        return Ok(());
    };

    let extension = Path::new(filename)
        .extension()
        .and_then(|ext| ext.to_str())
        .map(str::to_ascii_lowercase);
    match extension {
        Some(ext) if MESSAGE_EXTENSIONS.contains(&ext.as_str()) => {
            found.push((filename.clone(), part.get_body_raw()?));
        }
        _ => warn!("Unrecognized file extension of attachment {}", filename),
    }
    Ok(())
}
