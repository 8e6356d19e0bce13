//! Authentication service.
//!
//! Registration against onboarding codes, password login, refresh-token
//! rotation and logout. Claims are always re-derived from the stored account,
//! never taken from client input.

mod error;
pub mod password;
pub mod tokens;

pub use error::AuthError;
pub use password::{hash_password, validate_password, verify_password};
pub use tokens::{RefreshClaims, TokenIssuer, TokenPair};

use std::sync::Arc;

use business_cart_core::{AccountId, AccountStatus, Claims, Email, Role};

use crate::db::{AccountRepository, CodeRepository, RepositoryError};
use crate::models::{
    Account, AccountProfile, Code, CustomerCode, NewAccount, ProfileStatus,
};

/// Self-service registration input.
#[derive(Debug, Clone)]
pub struct Registration {
    pub name: String,
    pub email: String,
    pub password: String,
    pub role: Role,
    /// Company or partner code to claim.
    pub code: Option<String>,
    /// Customer codes linking a customer to its companies.
    pub customer_codes: Vec<String>,
}

/// Authentication service.
///
/// Handles registration, login and the token lifecycle.
#[derive(Clone)]
pub struct AuthService {
    accounts: Arc<dyn AccountRepository>,
    codes: Arc<dyn CodeRepository>,
    tokens: Arc<TokenIssuer>,
}

impl AuthService {
    /// Create a new authentication service.
    #[must_use]
    pub fn new(
        accounts: Arc<dyn AccountRepository>,
        codes: Arc<dyn CodeRepository>,
        tokens: Arc<TokenIssuer>,
    ) -> Self {
        Self {
            accounts,
            codes,
            tokens,
        }
    }

    /// The token issuer shared with request authentication.
    #[must_use]
    pub fn tokens(&self) -> &TokenIssuer {
        &self.tokens
    }

    // =========================================================================
    // Registration
    // =========================================================================

    /// Register a company, customer or partner account.
    ///
    /// # Errors
    ///
    /// - `InvalidRole` for admin registrations
    /// - `InvalidCode` for a missing, unknown, claimed or wrong-kind code
    /// - `InvalidEmail`, `WeakPassword` or `Invalid` for bad input
    /// - `EmailTaken` if the email is already registered
    pub async fn register(&self, registration: Registration) -> Result<Account, AuthError> {
        let email = Email::parse(&registration.email)?;
        let name = registration.name.trim();
        if name.is_empty() {
            return Err(AuthError::Invalid("name is required".to_owned()));
        }
        validate_password(&registration.password)?;

        let (id, claim, status, profile) = match registration.role {
            Role::Admin => {
                return Err(AuthError::InvalidRole(
                    "admin accounts cannot self-register".to_owned(),
                ));
            }
            Role::Company => {
                let value = registration
                    .code
                    .as_deref()
                    .ok_or_else(|| AuthError::InvalidCode("company code is required".to_owned()))?;
                let code = self.claimable(value, |c| c.company_code == value).await?;
                let profile = AccountProfile::Company {
                    company_code_id: code.id,
                    company_code: code.company_code,
                    status: ProfileStatus::PendingSetup,
                };
                (code.id.as_account_id(), Some(code.id), AccountStatus::Pending, profile)
            }
            Role::Customer => {
                let customer_codes = self.customer_codes(&registration.customer_codes).await?;
                let profile = AccountProfile::Customer { customer_codes };
                (AccountId::generate(), None, AccountStatus::Active, profile)
            }
            Role::Partner => match registration.code.as_deref() {
                Some(value) => {
                    let code = self
                        .claimable(value, |c| c.partner_code.as_deref() == Some(value))
                        .await?;
                    let profile = AccountProfile::Partner {
                        partner_code_id: Some(code.id),
                        partner_code: Some(value.to_owned()),
                        status: ProfileStatus::Pending,
                    };
                    (code.id.as_account_id(), Some(code.id), AccountStatus::Pending, profile)
                }
                None => {
                    let profile = AccountProfile::Partner {
                        partner_code_id: None,
                        partner_code: None,
                        status: ProfileStatus::Pending,
                    };
                    (AccountId::generate(), None, AccountStatus::Pending, profile)
                }
            },
        };

        let password_hash = hash_password(&registration.password)?;
        let account = self
            .accounts
            .create(
                NewAccount {
                    id,
                    name: name.to_owned(),
                    email,
                    password_hash,
                    status,
                    profile,
                },
                claim,
            )
            .await
            .map_err(|e| match e {
                RepositoryError::Stale(_) => {
                    AuthError::InvalidCode("code has already been claimed".to_owned())
                }
                RepositoryError::Conflict(_) => AuthError::EmailTaken,
                other => AuthError::Repository(other),
            })?;

        tracing::info!(account_id = %account.id, role = %account.role, "Account registered");
        Ok(account)
    }

    /// Look up an unclaimed single-use code of the expected kind.
    async fn claimable(
        &self,
        value: &str,
        is_kind: impl Fn(&Code) -> bool + Send,
    ) -> Result<Code, AuthError> {
        let code = self
            .codes
            .find_by_value(value)
            .await?
            .filter(|c| is_kind(c))
            .ok_or_else(|| AuthError::InvalidCode(format!("unknown code '{value}'")))?;
        if code.is_claimed {
            return Err(AuthError::InvalidCode(
                "code has already been claimed".to_owned(),
            ));
        }
        Ok(code)
    }

    /// Resolve customer codes to `{codeId, code}` links, one per company.
    async fn customer_codes(&self, values: &[String]) -> Result<Vec<CustomerCode>, AuthError> {
        if values.is_empty() {
            return Err(AuthError::InvalidCode(
                "at least one customer code is required".to_owned(),
            ));
        }

        let mut links: Vec<CustomerCode> = Vec::with_capacity(values.len());
        for value in values {
            let code = self
                .codes
                .find_by_value(value)
                .await?
                .filter(|c| c.customer_code == *value)
                .ok_or_else(|| AuthError::InvalidCode(format!("unknown customer code '{value}'")))?;
            if links.iter().all(|l| l.code_id != code.id) {
                links.push(CustomerCode {
                    code_id: code.id,
                    code: code.customer_code,
                });
            }
        }
        Ok(links)
    }

    // =========================================================================
    // Sessions
    // =========================================================================

    /// Authenticate with email and password.
    ///
    /// # Errors
    ///
    /// `InvalidCredentials` for an unknown email or wrong password,
    /// `AccountInactive` if the account may not sign in.
    pub async fn login(&self, email: &str, password: &str) -> Result<TokenPair, AuthError> {
        let email = Email::parse(email).map_err(|_| AuthError::InvalidCredentials)?;
        let account = self
            .accounts
            .find_by_email(&email)
            .await?
            .ok_or(AuthError::InvalidCredentials)?;

        verify_password(password, &account.password_hash)?;
        if !account.status.can_sign_in() {
            return Err(AuthError::AccountInactive);
        }

        let pair = self.issue_for(&account).await?;
        tracing::info!(account_id = %account.id, "Account signed in");
        Ok(pair)
    }

    /// Exchange a refresh token for a new pair, consuming the old one.
    ///
    /// # Errors
    ///
    /// `RefreshNotFound` if the token was already used, `Expired` if it is past
    /// its expiry, `AccountNotFound` or `AccountInactive` if the account can no
    /// longer sign in.
    pub async fn refresh(&self, refresh_token: &str) -> Result<TokenPair, AuthError> {
        let verified = self.tokens.consume_refresh(refresh_token).await?;
        let account = self
            .accounts
            .find_by_id(verified.claims.subject)
            .await?
            .ok_or(AuthError::AccountNotFound)?;
        if !account.status.can_sign_in() {
            return Err(AuthError::AccountInactive);
        }
        self.issue_for(&account).await
    }

    /// Revoke an access token and, if given, delete a refresh token.
    ///
    /// # Errors
    ///
    /// Fails only if the access token is not ours or storage fails; an unknown
    /// refresh token is ignored.
    pub async fn logout(
        &self,
        access_token: &str,
        refresh_token: Option<&str>,
    ) -> Result<(), AuthError> {
        self.tokens.revoke(access_token).await?;
        if let Some(token) = refresh_token {
            match self.tokens.consume_refresh(token).await {
                Ok(_)
                | Err(
                    AuthError::RefreshNotFound
                    | AuthError::Expired
                    | AuthError::InvalidSignature
                    | AuthError::MalformedToken,
                ) => {}
                Err(other) => return Err(other),
            }
        }
        Ok(())
    }

    async fn issue_for(&self, account: &Account) -> Result<TokenPair, AuthError> {
        self.tokens
            .issue_pair(
                account.id,
                account.role,
                account.company_id(),
                &account.profile.associated_company_ids(),
            )
            .await
    }

    // =========================================================================
    // Reads
    // =========================================================================

    /// Accounts visible to the caller.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::Repository` if storage fails.
    pub async fn list_accounts(&self, claims: &Claims) -> Result<Vec<Account>, AuthError> {
        let predicate = business_cart_core::resolve_filter(
            claims.role,
            claims.subject,
            &claims.associated_company_ids,
            business_cart_core::Resource::Accounts,
        );
        Ok(self.accounts.list(&predicate).await?)
    }

    /// One account, if visible to the caller.
    ///
    /// # Errors
    ///
    /// `AccountNotFound` if absent or outside the caller's scope.
    pub async fn get_account(&self, claims: &Claims, id: AccountId) -> Result<Account, AuthError> {
        let predicate = business_cart_core::resolve_filter(
            claims.role,
            claims.subject,
            &claims.associated_company_ids,
            business_cart_core::Resource::Accounts,
        );
        self.accounts
            .find_by_id(id)
            .await?
            .filter(|a| predicate.admits_account(a.id, &a.profile.associated_company_ids()))
            .ok_or(AuthError::AccountNotFound)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use chrono::{DateTime, Duration, Utc};
    use secrecy::SecretString;

    use super::*;
    use crate::config::JwtConfig;
    use crate::db::Repositories;
    use crate::models::NewCode;

    /// Claims for `account` as they would be issued now.
    fn claims_for(account: &Account, expires_at: DateTime<Utc>) -> Claims {
        Claims {
            subject: account.id,
            role: account.role,
            company_id: account.company_id(),
            associated_company_ids: account.profile.associated_company_ids(),
            expires_at,
        }
    }

    fn service(repos: &Repositories) -> AuthService {
        let issuer = TokenIssuer::new(
            &JwtConfig {
                access_secret: SecretString::from("aB3$xY9!mK2@nL5#pQ7&rT0*uW4^zC6%"),
                refresh_secret: SecretString::from("Zq8#Lm1!Rt6@Vx3$Np9&Ks2*Hd7^Wf4%"),
            },
            repos.tokens.clone(),
        );
        AuthService::new(repos.accounts.clone(), repos.codes.clone(), Arc::new(issuer))
    }

    fn registration(role: Role, email: &str) -> Registration {
        Registration {
            name: "Acme".into(),
            email: email.into(),
            password: "correct horse battery".into(),
            role,
            code: None,
            customer_codes: Vec::new(),
        }
    }

    async fn issue_code(repos: &Repositories, prefix: &str) -> Code {
        repos
            .codes
            .create(NewCode {
                company_code: format!("{prefix}-CO"),
                customer_code: format!("{prefix}-CU"),
                partner_code: Some(format!("{prefix}-PA")),
            })
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn test_company_claims_code_and_takes_its_id() {
        let repos = Repositories::in_memory();
        let auth = service(&repos);
        let code = issue_code(&repos, "ACME").await;

        let mut input = registration(Role::Company, "owner@acme.test");
        input.code = Some("ACME-CO".into());
        let account = auth.register(input.clone()).await.unwrap();

        assert_eq!(account.id, code.id.as_account_id());
        assert_eq!(account.status, AccountStatus::Pending);
        assert!(matches!(
            account.profile,
            AccountProfile::Company {
                status: ProfileStatus::PendingSetup,
                ..
            }
        ));

        input.email = "second@acme.test".into();
        assert!(matches!(
            auth.register(input).await,
            Err(AuthError::InvalidCode(_))
        ));
    }

    #[tokio::test]
    async fn test_wrong_kind_of_code_is_rejected() {
        let repos = Repositories::in_memory();
        let auth = service(&repos);
        issue_code(&repos, "ACME").await;

        let mut input = registration(Role::Company, "owner@acme.test");
        input.code = Some("ACME-CU".into());
        assert!(matches!(
            auth.register(input).await,
            Err(AuthError::InvalidCode(_))
        ));

        let mut input = registration(Role::Customer, "buyer@shop.test");
        input.customer_codes = vec!["ACME-CO".into()];
        assert!(matches!(
            auth.register(input).await,
            Err(AuthError::InvalidCode(_))
        ));
    }

    #[tokio::test]
    async fn test_customer_codes_are_reusable_and_deduplicated() {
        let repos = Repositories::in_memory();
        let auth = service(&repos);
        let acme = issue_code(&repos, "ACME").await;
        let globex = issue_code(&repos, "GLOBEX").await;

        let mut input = registration(Role::Customer, "one@shop.test");
        input.customer_codes = vec!["ACME-CU".into(), "GLOBEX-CU".into(), "ACME-CU".into()];
        let one = auth.register(input).await.unwrap();

        let mut expected = vec![acme.id.as_account_id(), globex.id.as_account_id()];
        expected.sort_unstable();
        assert_eq!(one.profile.associated_company_ids(), expected);

        let mut input = registration(Role::Customer, "two@shop.test");
        input.customer_codes = vec!["ACME-CU".into()];
        auth.register(input).await.unwrap();

        let code = repos.codes.find_by_value("ACME-CU").await.unwrap().unwrap();
        assert!(!code.is_claimed);
    }

    #[tokio::test]
    async fn test_admin_cannot_self_register() {
        let repos = Repositories::in_memory();
        let result = service(&repos)
            .register(registration(Role::Admin, "root@platform.test"))
            .await;
        assert!(matches!(result, Err(AuthError::InvalidRole(_))));
    }

    #[tokio::test]
    async fn test_partner_without_code() {
        let repos = Repositories::in_memory();
        let account = service(&repos)
            .register(registration(Role::Partner, "partner@agency.test"))
            .await
            .unwrap();
        assert_eq!(account.role, Role::Partner);
        assert!(account.profile.associated_company_ids().is_empty());
    }

    #[tokio::test]
    async fn test_duplicate_email_is_taken() {
        let repos = Repositories::in_memory();
        let auth = service(&repos);
        auth.register(registration(Role::Partner, "dup@agency.test"))
            .await
            .unwrap();
        let result = auth
            .register(registration(Role::Partner, "DUP@agency.test"))
            .await;
        assert!(matches!(result, Err(AuthError::EmailTaken)));
    }

    #[tokio::test]
    async fn test_login_and_claims_derivation() {
        let repos = Repositories::in_memory();
        let auth = service(&repos);
        let acme = issue_code(&repos, "ACME").await;
        let mut input = registration(Role::Customer, "buyer@shop.test");
        input.customer_codes = vec!["ACME-CU".into()];
        let account = auth.register(input).await.unwrap();

        assert!(matches!(
            auth.login("buyer@shop.test", "wrong password").await,
            Err(AuthError::InvalidCredentials)
        ));
        assert!(matches!(
            auth.login("nobody@shop.test", "correct horse battery").await,
            Err(AuthError::InvalidCredentials)
        ));

        let pair = auth
            .login(" Buyer@Shop.test ", "correct horse battery")
            .await
            .unwrap();
        let claims = auth.tokens().verify(&pair.access_token).await.unwrap();
        let expected = claims_for(&account, claims.expires_at);
        assert_eq!(claims, expected);
        assert_eq!(claims.associated_company_ids, vec![acme.id.as_account_id()]);
    }

    #[tokio::test]
    async fn test_refresh_rotates_and_logout_revokes() {
        let repos = Repositories::in_memory();
        let auth = service(&repos);
        auth.register(registration(Role::Partner, "p@agency.test"))
            .await
            .unwrap();
        let first = auth
            .login("p@agency.test", "correct horse battery")
            .await
            .unwrap();

        let second = auth.refresh(&first.refresh_token).await.unwrap();
        assert!(matches!(
            auth.refresh(&first.refresh_token).await,
            Err(AuthError::RefreshNotFound)
        ));

        auth.logout(&second.access_token, Some(&second.refresh_token))
            .await
            .unwrap();
        assert!(matches!(
            auth.tokens().verify(&second.access_token).await,
            Err(AuthError::Blacklisted)
        ));
        assert!(matches!(
            auth.refresh(&second.refresh_token).await,
            Err(AuthError::RefreshNotFound)
        ));
        // The untouched first access token is still good until it expires.
        let claims = auth.tokens().verify(&first.access_token).await.unwrap();
        assert!(claims.expires_at > Utc::now() + Duration::hours(71));
    }

    #[tokio::test]
    async fn test_company_sees_its_customers() {
        let repos = Repositories::in_memory();
        let auth = service(&repos);
        issue_code(&repos, "ACME").await;
        issue_code(&repos, "GLOBEX").await;

        let mut company = registration(Role::Company, "owner@acme.test");
        company.code = Some("ACME-CO".into());
        let company = auth.register(company).await.unwrap();

        let mut ours = registration(Role::Customer, "ours@shop.test");
        ours.customer_codes = vec!["ACME-CU".into()];
        let ours = auth.register(ours).await.unwrap();

        let mut theirs = registration(Role::Customer, "theirs@shop.test");
        theirs.customer_codes = vec!["GLOBEX-CU".into()];
        let theirs = auth.register(theirs).await.unwrap();

        let claims = claims_for(&company, Utc::now() + Duration::hours(1));
        let mut visible: Vec<AccountId> = auth
            .list_accounts(&claims)
            .await
            .unwrap()
            .into_iter()
            .map(|a| a.id)
            .collect();
        visible.sort_unstable();
        let mut expected = vec![company.id, ours.id];
        expected.sort_unstable();
        assert_eq!(visible, expected);

        assert!(matches!(
            auth.get_account(&claims, theirs.id).await,
            Err(AuthError::AccountNotFound)
        ));
    }
}
