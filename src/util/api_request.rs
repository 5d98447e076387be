pub enum Method {
    Get,
    /// no request body, matching the lamp's command routes
    Post,
}

#[derive(Debug)]
pub enum RequestError {
    /// request could not be sent or no response arrived
    Transport(reqwest::Error),
    /// response arrived with a non-success status code
    Status(reqwest::StatusCode),
}

impl std::fmt::Display for RequestError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Transport(error) => write!(f, "sending request failed: {error}"),
            Self::Status(status) => write!(f, "request failed with status {status}"),
        }
    }
}

impl std::error::Error for RequestError {}

/// send a request and return the response if its status is a success
pub async fn send(
    method: Method,
    url: &str,
    query: Option<&[(&str, String)]>,
) -> Result<reqwest::Response, RequestError> {
    let client = reqwest::Client::new();
    let mut request = match method {
        Method::Get => client.get(url),
        Method::Post => client.post(url),
    };

    // set query parameters (if given)
    if let Some(query) = query {
        request = request.query(query);
    }

    let response = request.send().await.map_err(RequestError::Transport)?;
    if !response.status().is_success() {
        return Err(RequestError::Status(response.status()));
    }
    Ok(response)
}
