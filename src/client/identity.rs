/**
 * Identity API Client
 *
 * Thin client over `/api/v1/identity`. All calls go through the session
 * gateway; login is marked exempt so a wrong password comes back as a plain
 * 401 instead of kicking off a session refresh.
 */

use crate::client::error::ClientError;
use crate::client::gateway::SessionGateway;
use crate::client::transport::{ApiRequest, ReqwestTransport, Transport};
use crate::shared::identity::{
    ChangePasswordRequest, LoginRequest, LoginResponse, MeResponse, MessageResponse,
    RegisterRequest, RegisterResponse, UserInfo, DEFAULT_ROLE,
};

/// Base path of the identity service
pub const IDENTITY_BASE: &str = "/api/v1/identity";

const MIN_REGISTER_PASSWORD: usize = 8;
const MIN_CHANGED_PASSWORD: usize = 6;

/// Identity API client
pub struct IdentityClient<T: Transport = ReqwestTransport> {
    gateway: SessionGateway<T>,
}

impl<T: Transport> Clone for IdentityClient<T> {
    fn clone(&self) -> Self {
        Self {
            gateway: self.gateway.clone(),
        }
    }
}

impl<T: Transport> IdentityClient<T> {
    pub fn new(gateway: SessionGateway<T>) -> Self {
        Self { gateway }
    }

    pub fn gateway(&self) -> &SessionGateway<T> {
        &self.gateway
    }

    fn path(endpoint: &str) -> String {
        format!("{}{}", IDENTITY_BASE, endpoint)
    }

    /// Register a new account; does not log in
    pub async fn register(
        &self,
        name: &str,
        email: &str,
        password: &str,
    ) -> Result<RegisterResponse, ClientError> {
        if name.trim().is_empty() {
            return Err(ClientError::validation("name", "Name is required"));
        }
        validate_email(email)?;
        if password.chars().count() < MIN_REGISTER_PASSWORD {
            return Err(ClientError::validation(
                "password",
                format!("Password must be at least {} characters", MIN_REGISTER_PASSWORD),
            ));
        }

        let request = RegisterRequest {
            name: name.trim().to_string(),
            email: email.trim().to_string(),
            password: password.to_string(),
            role: DEFAULT_ROLE.to_string(),
        };
        let response = self.gateway.post(&Self::path("/register"), &request).await?;
        Ok(response.json()?)
    }

    /// Log in; the session cookie lands in the transport's cookie jar
    pub async fn login(&self, email: &str, password: &str) -> Result<LoginResponse, ClientError> {
        if email.trim().is_empty() || password.is_empty() {
            return Err(ClientError::validation(
                "credentials",
                "Email and password are required",
            ));
        }

        let request = ApiRequest::post(Self::path("/login"))
            .json(&LoginRequest {
                email: email.trim().to_string(),
                password: password.to_string(),
            })?
            .exempt();
        let response = self.gateway.send(request).await?;
        Ok(response.json()?)
    }

    pub async fn logout(&self) -> Result<MessageResponse, ClientError> {
        let response = self
            .gateway
            .send(ApiRequest::post(Self::path("/logout")))
            .await?;
        Ok(response.json().unwrap_or_default())
    }

    /// Profile of the logged-in user
    pub async fn me(&self) -> Result<UserInfo, ClientError> {
        let response = self.gateway.get(&Self::path("/me")).await?;
        let me: MeResponse = response.json()?;
        Ok(me.user)
    }

    pub async fn change_password(
        &self,
        old_password: &str,
        new_password: &str,
    ) -> Result<MessageResponse, ClientError> {
        if old_password.is_empty() {
            return Err(ClientError::validation("old_password", "Current password is required"));
        }
        if new_password.chars().count() < MIN_CHANGED_PASSWORD {
            return Err(ClientError::validation(
                "new_password",
                format!("New password must be at least {} characters", MIN_CHANGED_PASSWORD),
            ));
        }
        if new_password == old_password {
            return Err(ClientError::validation(
                "new_password",
                "New password must differ from the current one",
            ));
        }

        let request = ChangePasswordRequest {
            old_password: old_password.to_string(),
            new_password: new_password.to_string(),
        };
        let response = self
            .gateway
            .patch(&Self::path("/users/me/password"), &request)
            .await?;
        Ok(response.json().unwrap_or_default())
    }
}

fn validate_email(email: &str) -> Result<(), ClientError> {
    let email = email.trim();
    let valid = match email.split_once('@') {
        Some((local, domain)) => !local.is_empty() && domain.contains('.') && !domain.starts_with('.'),
        None => false,
    };
    if valid {
        Ok(())
    } else {
        Err(ClientError::validation("email", "Invalid email format"))
    }
}
