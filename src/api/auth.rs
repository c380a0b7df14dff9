use serde::Serialize;

use super::response::{MessageBody, UserEnvelope};
use crate::http::{ApiRequest, ClientError, HttpClient};
use crate::session::Session;

pub const LOGIN: &str = "/auth/login";
pub const REGISTER: &str = "/auth/register";
pub const LOGOUT: &str = "/auth/logout";
pub const REFRESH: &str = "/auth/refresh";
pub const ME: &str = "/auth/me";
pub const FORGOT_PASSWORD: &str = "/auth/forgot-password";
pub const RESET_PASSWORD: &str = "/auth/reset-password";

#[derive(Clone, Serialize)]
pub struct Credentials {
    pub email: String,
    pub password: String,
}

impl Credentials {
    pub fn new(email: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            email: email.into(),
            password: password.into(),
        }
    }
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("email", &self.email)
            .field("password", &"<redacted>")
            .finish()
    }
}

#[derive(Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Registration {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub city_id: Option<String>,
    pub email: String,
    pub password: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
}

impl std::fmt::Debug for Registration {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Registration")
            .field("city_id", &self.city_id)
            .field("email", &self.email)
            .field("password", &"<redacted>")
            .field("role", &self.role)
            .finish()
    }
}

#[derive(Clone, Serialize)]
pub struct PasswordReset {
    pub password: String,
    pub token: String,
}

#[derive(Serialize)]
struct ForgotPassword<'a> {
    email: &'a str,
}

/// Typed calls against the remote authentication endpoints.
///
/// Everything except `me` bypasses credential renewal: a 401 from login
/// means bad credentials, and the refresh call must never recurse.
#[derive(Debug, Clone, Copy)]
pub struct AuthApi<'a> {
    client: &'a HttpClient,
}

impl<'a> AuthApi<'a> {
    pub fn new(client: &'a HttpClient) -> Self {
        Self { client }
    }

    pub async fn login(&self, credentials: &Credentials) -> Result<Session, ClientError> {
        let request = ApiRequest::post(LOGIN).json(credentials)?.without_renewal();
        let envelope: UserEnvelope = self.client.send(request).await?.json()?;
        Ok(envelope.user)
    }

    pub async fn register(&self, registration: &Registration) -> Result<Session, ClientError> {
        let request = ApiRequest::post(REGISTER)
            .json(registration)?
            .without_renewal();
        let envelope: UserEnvelope = self.client.send(request).await?.json()?;
        Ok(envelope.user)
    }

    pub async fn logout(&self) -> Result<(), ClientError> {
        self.client
            .send(ApiRequest::post(LOGOUT).without_renewal())
            .await?;
        Ok(())
    }

    /// Explicit credential renewal, outside of any wavefront
    pub async fn refresh(&self) -> Result<(), ClientError> {
        self.client
            .send(ApiRequest::post(REFRESH).without_renewal())
            .await?;
        Ok(())
    }

    /// Current user profile. Eligible for renewal on 401.
    pub async fn me(&self) -> Result<Session, ClientError> {
        let envelope: UserEnvelope = self.client.send(ApiRequest::get(ME)).await?.json()?;
        Ok(envelope.user)
    }

    pub async fn forgot_password(&self, email: &str) -> Result<Option<String>, ClientError> {
        let request = ApiRequest::post(FORGOT_PASSWORD)
            .json(&ForgotPassword { email })?
            .without_renewal();
        let body: Option<MessageBody> = self.client.send(request).await?.json()?;
        Ok(body.and_then(|b| b.message))
    }

    pub async fn reset_password(&self, reset: &PasswordReset) -> Result<Option<String>, ClientError> {
        let request = ApiRequest::post(RESET_PASSWORD)
            .json(reset)?
            .without_renewal();
        let body: Option<MessageBody> = self.client.send(request).await?.json()?;
        Ok(body.and_then(|b| b.message))
    }
}

impl HttpClient {
    pub fn auth(&self) -> AuthApi<'_> {
        AuthApi::new(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::TestStack;

    #[test]
    fn test_registration_wire_format() {
        let registration = Registration {
            city_id: Some("7".to_string()),
            email: "ana@example.org".to_string(),
            password: "hunter22".to_string(),
            role: None,
        };
        let value = serde_json::to_value(&registration).unwrap();
        assert_eq!(
            value,
            serde_json::json!({"cityId": "7", "email": "ana@example.org", "password": "hunter22"})
        );
    }

    #[test]
    fn test_debug_redacts_password() {
        let credentials = Credentials::new("ana@example.org", "hunter22");
        let printed = format!("{credentials:?}");
        assert!(!printed.contains("hunter22"));
        assert!(printed.contains("ana@example.org"));
    }

    #[tokio::test]
    async fn test_login_401_is_not_renewed() {
        let stack = TestStack::new();

        let err = stack
            .client
            .auth()
            .login(&Credentials::new("ana@example.org", "wrong"))
            .await
            .unwrap_err();

        assert!(err.is_unauthorized());
        assert_eq!(err.message(), Some("Invalid credentials"));
        assert_eq!(stack.remote.calls_to(REFRESH), 0);
    }

    #[tokio::test]
    async fn test_me_renews_on_401() {
        let stack = TestStack::new();

        let user = stack.client.auth().me().await.unwrap();

        assert_eq!(user.email, "ana@example.org");
        assert_eq!(stack.remote.calls_to(REFRESH), 1);
        assert_eq!(stack.remote.calls_to(ME), 2);
    }

    #[tokio::test]
    async fn test_explicit_refresh_authorizes_without_coordinator() {
        let stack = TestStack::new();

        stack.client.auth().refresh().await.unwrap();

        assert_eq!(stack.remote.calls_to(REFRESH), 1);
        assert!(!stack.client.coordinator().is_renewing());
        assert_eq!(stack.client.auth().me().await.unwrap().email, "ana@example.org");
        // Already authorized: no second refresh
        assert_eq!(stack.remote.calls_to(REFRESH), 1);
    }

    #[tokio::test]
    async fn test_explicit_refresh_failure_is_returned_as_is() {
        let stack = TestStack::new();
        stack.remote.set_refresh_succeeds(false);
        stack.store.set(crate::testutil::make_session("u1"));

        let err = stack.client.auth().refresh().await.unwrap_err();

        assert!(err.is_unauthorized());
        assert!(!err.is_renewal_failure());
        // Outside a wavefront there is no teardown
        assert!(stack.store.get().is_some());
        assert!(stack.navigator.navigations().is_empty());
    }

    #[tokio::test]
    async fn test_password_endpoints_never_renew() {
        let stack = TestStack::new();

        let message = stack
            .client
            .auth()
            .forgot_password("ana@example.org")
            .await
            .unwrap();
        assert_eq!(message.as_deref(), Some("If the account exists, an email was sent"));

        let reset = PasswordReset {
            password: "n3w-pass".to_string(),
            token: "expired".to_string(),
        };
        let err = stack.client.auth().reset_password(&reset).await.unwrap_err();
        assert!(err.is_unauthorized());
        assert_eq!(stack.remote.calls_to(REFRESH), 0);
    }
}
