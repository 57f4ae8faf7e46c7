// Grill endpoints
//
// Discovery, per-grill state fetch, and command submission. State comes
// back as a plaintext frame (decode it with `codec::status::decode`);
// commands go up as plaintext octets from `codec::command`.

use reqwest::header::{AUTHORIZATION, CONTENT_TYPE};
use tracing::debug;

use crate::client::CloudClient;
use crate::codec::command::EncodedCommand;
use crate::error::Error;
use crate::models::GrillRecord;

impl CloudClient {
    /// List the grills registered to the authenticated account.
    ///
    /// `GET /grill`. Idempotent; safe to call repeatedly to pick up newly
    /// added grills. Does not retry internally -- callers apply their own
    /// backoff.
    pub async fn list_grills(&self) -> Result<Vec<GrillRecord>, Error> {
        let url = self.grills_url();
        debug!("GET {url}");

        let resp = self
            .send_authed(|http, token| http.get(url.clone()).header(AUTHORIZATION, token))
            .await?;
        let resp = Self::check_status(resp, None).await?;

        let body = resp.text().await.map_err(Error::Transport)?;
        serde_json::from_str(&body).map_err(|e| {
            let preview: String = body.chars().take(200).collect();
            Error::Deserialization {
                message: format!("{e} (body preview: {preview:?})"),
                body,
            }
        })
    }

    /// Fetch a grill's raw status frame.
    ///
    /// `GET /grill/{connectionType}|{grillId}/state`. Returns the
    /// undecoded plaintext payload; a 404 means the grill is not
    /// currently online and maps to [`Error::GrillUnreachable`].
    pub async fn grill_status(
        &self,
        connection_type: &str,
        grill_id: &str,
    ) -> Result<String, Error> {
        let url = self.grill_url(connection_type, grill_id, "state");
        debug!("GET {url}");

        let resp = self
            .send_authed(|http, token| http.get(url.clone()).header(AUTHORIZATION, token))
            .await?;
        let key = format!("{connection_type}|{grill_id}");
        let resp = Self::check_status(resp, Some(&key)).await?;

        resp.text().await.map_err(Error::Transport)
    }

    /// Submit one encoded command to a grill.
    ///
    /// `PUT /grill/{connectionType}|{grillId}/command` with the command
    /// bytes as `application/octet-stream` (what the device firmware
    /// expects on its control channel).
    pub async fn send_command(
        &self,
        connection_type: &str,
        grill_id: &str,
        command: &EncodedCommand,
    ) -> Result<(), Error> {
        let url = self.grill_url(connection_type, grill_id, "command");
        debug!(command = %command, "PUT {url}");

        let body = command.as_str().to_owned();
        let resp = self
            .send_authed(move |http, token| {
                http.put(url.clone())
                    .header(AUTHORIZATION, token)
                    .header(CONTENT_TYPE, "application/octet-stream")
                    .body(body.clone())
            })
            .await?;
        let key = format!("{connection_type}|{grill_id}");
        Self::check_status(resp, Some(&key)).await?;
        Ok(())
    }
}
