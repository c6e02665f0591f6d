//! In-memory IAM emulation (users and access keys)

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use dashmap::DashMap;
use keyrotator_core::{
    AccessKey, AccessKeyMetadata, CredentialStore, CredentialStoreError, ProbeOutcome,
    MAX_ACCESS_KEYS_PER_USER,
};
use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};
use uuid::Uuid;

/// An IAM User
#[derive(Debug, Clone)]
pub struct User {
    /// User name
    pub user_name: String,
    /// User ID
    pub user_id: String,
    /// User ARN
    pub arn: String,
    /// Path
    pub path: String,
    /// Creation date
    pub create_date: DateTime<Utc>,
    /// Access keys, oldest first
    pub access_keys: Vec<StoredAccessKey>,
    /// Whether the user may call read-only account APIs
    pub can_read_account: bool,
}

/// An access key held by the emulator
#[derive(Debug, Clone)]
pub struct StoredAccessKey {
    pub access_key_id: String,
    pub secret_access_key: String,
    pub status: String,
    pub create_date: DateTime<Utc>,
}

/// In-memory IAM storage
#[derive(Debug)]
pub struct InMemoryCredentialStore {
    /// Users indexed by name
    users: DashMap<String, User>,
    /// Last issued key timestamp, kept strictly increasing
    clock: Mutex<DateTime<Utc>>,
    /// When set, DeleteAccessKey fails
    fail_deletes: AtomicBool,
    /// When set, probes fail with this error code
    probe_failure: Mutex<Option<String>>,
}

impl Default for InMemoryCredentialStore {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryCredentialStore {
    pub fn new() -> Self {
        Self {
            users: DashMap::new(),
            clock: Mutex::new(Utc::now()),
            fail_deletes: AtomicBool::new(false),
            probe_failure: Mutex::new(None),
        }
    }

    /// Create a user
    pub fn create_user(&self, user_name: &str, path: Option<String>) -> Result<User, CredentialStoreError> {
        if self.users.contains_key(user_name) {
            return Err(CredentialStoreError::service(
                "EntityAlreadyExists",
                format!("User {} already exists", user_name),
            ));
        }

        let path = path.unwrap_or_else(|| "/".to_string());
        let user_id = format!(
            "AIDA{}",
            &Uuid::new_v4().simple().to_string()[..17].to_uppercase()
        );
        let arn = format!("arn:aws:iam::000000000000:user{}{}", path, user_name);

        let user = User {
            user_name: user_name.to_string(),
            user_id,
            arn,
            path,
            create_date: Utc::now(),
            access_keys: Vec::new(),
            can_read_account: false,
        };

        self.users.insert(user_name.to_string(), user.clone());
        Ok(user)
    }

    /// Let the user's keys pass read-only account calls
    pub fn grant_read_access(&self, user_name: &str) -> Result<(), CredentialStoreError> {
        let mut user = self.user_mut(user_name)?;
        user.can_read_account = true;
        Ok(())
    }

    /// Add an access key with an explicit creation date
    pub fn seed_access_key(
        &self,
        user_name: &str,
        created_at: DateTime<Utc>,
    ) -> Result<AccessKey, CredentialStoreError> {
        self.issue_key(user_name, created_at)
    }

    /// Access key IDs for a user, oldest first
    pub fn access_key_ids(&self, user_name: &str) -> Vec<String> {
        self.users
            .get(user_name)
            .map(|u| u.access_keys.iter().map(|k| k.access_key_id.clone()).collect())
            .unwrap_or_default()
    }

    pub fn fail_deletes(&self, fail: bool) {
        self.fail_deletes.store(fail, Ordering::SeqCst);
    }

    /// Make probes fail with `code`, or clear it
    pub fn fail_probes_with(&self, code: Option<&str>) {
        *self.probe_failure.lock() = code.map(str::to_string);
    }

    fn user_mut(
        &self,
        user_name: &str,
    ) -> Result<dashmap::mapref::one::RefMut<'_, String, User>, CredentialStoreError> {
        self.users
            .get_mut(user_name)
            .ok_or_else(|| CredentialStoreError::NoSuchEntity(format!("User {}", user_name)))
    }

    fn next_timestamp(&self) -> DateTime<Utc> {
        let mut last = self.clock.lock();
        let now = Utc::now().max(*last + Duration::milliseconds(1));
        *last = now;
        now
    }

    fn issue_key(
        &self,
        user_name: &str,
        created_at: DateTime<Utc>,
    ) -> Result<AccessKey, CredentialStoreError> {
        let mut user = self.user_mut(user_name)?;
        if user.access_keys.len() >= MAX_ACCESS_KEYS_PER_USER {
            return Err(CredentialStoreError::LimitExceeded(format!(
                "Cannot exceed quota for AccessKeysPerUser: {}",
                MAX_ACCESS_KEYS_PER_USER
            )));
        }

        let access_key_id = format!(
            "AKIA{}",
            &Uuid::new_v4().simple().to_string()[..16].to_uppercase()
        );
        let secret_access_key =
            format!("{}{}", Uuid::new_v4().simple(), Uuid::new_v4().simple())[..40].to_string();

        user.access_keys.push(StoredAccessKey {
            access_key_id: access_key_id.clone(),
            secret_access_key: secret_access_key.clone(),
            status: "Active".to_string(),
            create_date: created_at,
        });
        user.access_keys.sort_by_key(|k| k.create_date);

        Ok(AccessKey {
            user_name: user_name.to_string(),
            access_key_id,
            secret_access_key,
            created_at,
        })
    }
}

#[async_trait]
impl CredentialStore for InMemoryCredentialStore {
    async fn list_access_keys(
        &self,
        user_name: &str,
    ) -> Result<Vec<AccessKeyMetadata>, CredentialStoreError> {
        let user = self
            .users
            .get(user_name)
            .ok_or_else(|| CredentialStoreError::NoSuchEntity(format!("User {}", user_name)))?;

        Ok(user
            .access_keys
            .iter()
            .map(|k| AccessKeyMetadata {
                user_name: user.user_name.clone(),
                access_key_id: k.access_key_id.clone(),
                status: Some(k.status.clone()),
                created_at: Some(k.create_date),
            })
            .collect())
    }

    async fn create_access_key(&self, user_name: &str) -> Result<AccessKey, CredentialStoreError> {
        let created_at = self.next_timestamp();
        self.issue_key(user_name, created_at)
    }

    async fn delete_access_key(
        &self,
        user_name: &str,
        access_key_id: &str,
    ) -> Result<(), CredentialStoreError> {
        if self.fail_deletes.load(Ordering::SeqCst) {
            return Err(CredentialStoreError::service(
                "ServiceFailure",
                "injected delete failure",
            ));
        }

        let mut user = self.user_mut(user_name)?;
        let before = user.access_keys.len();
        user.access_keys.retain(|k| k.access_key_id != access_key_id);
        if user.access_keys.len() == before {
            return Err(CredentialStoreError::NoSuchEntity(format!(
                "Access key {}",
                access_key_id
            )));
        }
        Ok(())
    }

    async fn probe(
        &self,
        access_key_id: &str,
        secret_access_key: &str,
    ) -> Result<ProbeOutcome, CredentialStoreError> {
        if let Some(code) = self.probe_failure.lock().clone() {
            return ProbeOutcome::from_error_code(&code)
                .ok_or_else(|| CredentialStoreError::service(code, "injected probe failure"));
        }

        let owner = self.users.iter().find_map(|user| {
            user.access_keys
                .iter()
                .find(|k| k.access_key_id == access_key_id && k.status == "Active")
                .map(|k| (k.secret_access_key == secret_access_key, user.can_read_account))
        });

        Ok(match owner {
            None => ProbeOutcome::AuthenticationFailed {
                code: "InvalidClientTokenId".to_string(),
            },
            Some((false, _)) => ProbeOutcome::AuthenticationFailed {
                code: "SignatureDoesNotMatch".to_string(),
            },
            Some((true, true)) => ProbeOutcome::Authenticated,
            Some((true, false)) => ProbeOutcome::AuthorizationDenied {
                code: "AccessDenied".to_string(),
            },
        })
    }
}
