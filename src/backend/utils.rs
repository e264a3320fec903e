#[derive(Debug, thiserror::Error)]
#[error("{status_code} status code")]
pub struct ServerError {
    pub status_code: u16,
    pub body: String,
}

/// Turn a non-success response into a [`ServerError`], keeping the body
/// for diagnostics.
pub async fn check_status(res: reqwest::Response) -> Result<reqwest::Response, ServerError> {
    let status = res.status();
    if !status.is_success() {
        let body = res.text().await.unwrap_or_default();
        return Err(ServerError {
            status_code: status.as_u16(),
            body,
        });
    }
    Ok(res)
}
