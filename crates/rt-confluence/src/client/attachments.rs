//! Attachment operations for Confluence API.

use rand::RngExt;
use tracing::{debug, info};

use super::{ConfluenceClient, read_json};
use crate::error::ConfluenceError;
use crate::types::{Attachment, AttachmentsResponse};

/// Attachments requested per listing call.
const PAGE_SIZE: usize = 50;

/// Largest attachment we are willing to download.
const MAX_DOWNLOAD_BYTES: u64 = 512 * 1024 * 1024;

impl ConfluenceClient {
    /// List every attachment on a page.
    ///
    /// Pages through results until a batch comes back smaller than the
    /// requested page size.
    pub(crate) fn list_attachments(
        &self,
        page_id: &str,
    ) -> Result<Vec<Attachment>, ConfluenceError> {
        let url = format!("{}/content/{}/child/attachment", self.api_url(), page_id);
        let resource = format!("attachments of page {page_id}");
        let limit = PAGE_SIZE.to_string();

        let mut attachments = Vec::new();
        let mut start = 0;
        loop {
            let response = self
                .get(&url)
                .query("start", start.to_string())
                .query("limit", &limit)
                .query("expand", "version")
                .call()?;
            let batch: AttachmentsResponse = read_json(response, &resource)?;
            let count = batch.results.len();
            attachments.extend(batch.results);

            if count < PAGE_SIZE {
                break;
            }
            start += count;
        }

        debug!(page_id, count = attachments.len(), "Listed attachments");
        Ok(attachments)
    }

    /// Download attachment content.
    pub(crate) fn download(&self, attachment: &Attachment) -> Result<Vec<u8>, ConfluenceError> {
        let link = attachment.links.download.as_deref().ok_or_else(|| {
            ConfluenceError::UnexpectedResponse(format!(
                "attachment '{}' has no download link",
                attachment.title
            ))
        })?;

        let response = self
            .agent
            .get(&self.resolve_link(link))
            .header("Authorization", &self.auth_header)
            .call()?;

        let status = response.status().as_u16();
        let mut body = response.into_body();
        if status >= 400 {
            let error_body = body
                .read_to_string()
                .unwrap_or_else(|_| "(unable to read error body)".to_owned());
            return Err(ConfluenceError::from_status(
                status,
                error_body,
                &format!("attachment {}", attachment.title),
            ));
        }

        Ok(body.with_config().limit(MAX_DOWNLOAD_BYTES).read_to_vec()?)
    }

    /// Upload or update attachment (upsert by filename).
    pub(crate) fn upload(
        &self,
        page_id: &str,
        filename: &str,
        data: &[u8],
        content_type: &str,
    ) -> Result<Attachment, ConfluenceError> {
        let existing = self
            .list_attachments(page_id)?
            .into_iter()
            .find(|a| a.title == filename);

        let url = if let Some(ref att) = existing {
            info!("Updating existing attachment '{}' (id={})", filename, att.id);
            format!(
                "{}/content/{}/child/attachment/{}/data",
                self.api_url(),
                page_id,
                att.id
            )
        } else {
            info!("Uploading new attachment '{}' to page {}", filename, page_id);
            format!("{}/content/{}/child/attachment", self.api_url(), page_id)
        };

        let boundary = format!(
            "----RoundtripperBoundary{:016x}",
            rand::rng().random::<u64>()
        );
        let body = multipart_body(&boundary, filename, data, content_type);

        let response = self
            .agent
            .post(&url)
            .header("Authorization", &self.auth_header)
            .header(
                "Content-Type",
                &format!("multipart/form-data; boundary={boundary}"),
            )
            .header("X-Atlassian-Token", "nocheck")
            .header("Accept", "application/json")
            .send(&body[..])?;

        let resource = format!("attachment {filename}");

        // Response is a list for new uploads, single object for updates
        if existing.is_some() {
            read_json(response, &resource)
        } else {
            let response: AttachmentsResponse = read_json(response, &resource)?;
            response.results.into_iter().next().ok_or_else(|| {
                ConfluenceError::UnexpectedResponse("empty attachment upload response".to_owned())
            })
        }
    }
}

fn multipart_body(boundary: &str, filename: &str, data: &[u8], content_type: &str) -> Vec<u8> {
    let mut body = Vec::with_capacity(data.len() + 256);
    body.extend_from_slice(format!("--{boundary}\r\n").as_bytes());
    body.extend_from_slice(
        format!("Content-Disposition: form-data; name=\"file\"; filename=\"{filename}\"\r\n")
            .as_bytes(),
    );
    body.extend_from_slice(format!("Content-Type: {content_type}\r\n\r\n").as_bytes());
    body.extend_from_slice(data);
    body.extend_from_slice(b"\r\n");
    body.extend_from_slice(format!("--{boundary}--\r\n").as_bytes());
    body
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_multipart_body_layout() {
        let body = multipart_body("XYZ", "a.txt", b"hello", "text/plain");
        let text = String::from_utf8(body).unwrap();
        assert!(text.starts_with("--XYZ\r\n"));
        assert!(text.contains("filename=\"a.txt\""));
        assert!(text.contains("Content-Type: text/plain\r\n\r\nhello\r\n"));
        assert!(text.ends_with("--XYZ--\r\n"));
    }
}
