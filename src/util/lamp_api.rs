use crate::util::api_request::{self, Method, RequestError};
use crate::util::secrets;
use std::future::Future;

/// failed lamp command. commands are best-effort and never retried.
#[derive(Debug)]
pub struct CommandError(pub RequestError);

impl std::fmt::Display for CommandError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "lamp command failed: {}", self.0)
    }
}

impl std::error::Error for CommandError {}

/// the lamp's remote command surface. seam for tests.
pub trait Lamp {
    /// brightness in percent from 0 to 100
    fn set_brightness(&self, percent: u8) -> impl Future<Output = Result<(), CommandError>> + Send;
    fn set_color(&self, name: &str) -> impl Future<Output = Result<(), CommandError>> + Send;
    fn set_pattern(&self, name: &str) -> impl Future<Output = Result<(), CommandError>> + Send;
}

/// the real lamp, reached over its http server configured in `secrets`
pub struct LampApi;

/// decimal string from 0 to 1 for the lamp's brightness route
fn brightness_fraction(percent: u8) -> String {
    (f64::from(percent.min(100)) / 100.0).to_string()
}

impl Lamp for LampApi {
    async fn set_brightness(&self, percent: u8) -> Result<(), CommandError> {
        let url = format!("{}/brightness/{}", secrets::lamp_host(), brightness_fraction(percent));
        api_request::send(Method::Post, &url, None).await.map_err(CommandError)?;
        println!("LAMP: brightness set to {percent}%");
        Ok(())
    }

    async fn set_color(&self, name: &str) -> Result<(), CommandError> {
        let url = format!("{}/color/{name}", secrets::lamp_host());
        api_request::send(Method::Post, &url, None).await.map_err(CommandError)?;
        println!("LAMP: color set to {name}");
        Ok(())
    }

    async fn set_pattern(&self, name: &str) -> Result<(), CommandError> {
        let url = format!("{}/pattern/{name}", secrets::lamp_host());
        api_request::send(Method::Post, &url, None).await.map_err(CommandError)?;
        println!("LAMP: pattern {name} started");
        Ok(())
    }
}
