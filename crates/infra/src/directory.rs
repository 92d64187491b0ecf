//! User registration and removal.

use chrono::Utc;
use tracing::{debug, info, instrument};

use pharmacy_auth::{NewUser, User};
use pharmacy_core::{DomainError, ExpectedVersion, Filter, UserId};

use crate::entity_store::{EntityStore, StoreError, INITIAL_VERSION};
use crate::error::LifecycleResult;
use crate::guards::IntegrityGuard;

#[derive(Debug, Clone)]
pub struct UserDirectory<S> {
    store: S,
    integrity: IntegrityGuard<S>,
}

impl<S: EntityStore + Clone> UserDirectory<S> {
    pub fn new(store: S) -> Self {
        Self {
            integrity: IntegrityGuard::new(store.clone()),
            store,
        }
    }

    /// Register a user; usernames are unique.
    #[instrument(skip(self, input), fields(username = %input.username))]
    pub fn register_user(&self, input: NewUser) -> LifecycleResult<User> {
        let mut user = User::register(input, Utc::now())?;
        let taken = Filter::all().eq("username", user.username.as_str());
        if self.store.any_where::<User>(&taken)? {
            return Err(username_taken(&user.username).into());
        }
        // A concurrent registration can win between the check and the insert;
        // the store's unique index then reports it as a concurrency failure.
        user.id = match self.store.insert(&user) {
            Ok(id) => id,
            Err(StoreError::Concurrency(detail)) => {
                debug!(%detail, "username claimed concurrently");
                return Err(username_taken(&user.username).into());
            }
            Err(e) => return Err(e.into()),
        };
        user.version = INITIAL_VERSION;
        info!(user_id = %user.id, role = %user.role, "user registered");
        Ok(user)
    }

    /// Stamp `last_login_at` with the current time.
    #[instrument(skip(self))]
    pub fn record_login(&self, user_id: UserId) -> LifecycleResult<User> {
        let mut user = self
            .store
            .get::<User>(user_id)?
            .ok_or_else(|| StoreError::not_found::<User>(user_id))?;
        user.record_login(Utc::now());
        user.version = self.store.update(&user, ExpectedVersion::Exact(user.version))?;
        Ok(user)
    }

    /// Remove a user that owns no orders. Notifications still addressed to
    /// the user also block removal (store-level restriction).
    #[instrument(skip(self))]
    pub fn delete_user(&self, user_id: UserId) -> LifecycleResult<()> {
        self.integrity.validate_user_deletion(user_id)?;
        self.store.delete::<User>(user_id)?;
        info!(%user_id, "user deleted");
        Ok(())
    }
}

fn username_taken(username: &str) -> DomainError {
    DomainError::conflict(format!("username '{username}' is taken"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::LifecycleError;
    use crate::test_support::{FaultyStore, Fixture, Op};
    use pharmacy_auth::Role;
    use pharmacy_core::{EntityKind, SurrogateKey};

    fn input(username: &str) -> NewUser {
        NewUser {
            username: username.into(),
            password_credential: "bcrypt$abc".into(),
            email: format!("{username}@pharmacy.test"),
            display_name: username.to_uppercase(),
            role: Role::Admin,
        }
    }

    #[test]
    fn usernames_are_unique() {
        let fx = Fixture::new();
        let directory = UserDirectory::new(fx.store.clone());

        let user = directory.register_user(input("vera")).unwrap();
        assert!(user.id.is_assigned());
        assert!(user.last_login_at.is_none());

        assert!(matches!(
            directory.register_user(input("vera")),
            Err(LifecycleError::Conflict(_))
        ));
        assert!(matches!(
            directory.register_user(input("  ")),
            Err(LifecycleError::Validation(_))
        ));
    }

    #[test]
    fn losing_a_registration_race_is_a_conflict() {
        let fx = Fixture::new();
        let store = FaultyStore::new(fx.store.clone());
        store.fail(
            Op::Insert,
            EntityKind::User,
            StoreError::Concurrency("duplicate key value violates unique constraint".into()),
            1,
        );
        let directory = UserDirectory::new(store);

        assert!(matches!(
            directory.register_user(input("zack")),
            Err(LifecycleError::Conflict(_))
        ));
        assert_eq!(fx.count(EntityKind::User), 0);

        let user = directory.register_user(input("zack")).unwrap();
        assert!(user.id.is_assigned());
    }

    #[test]
    fn login_is_recorded() {
        let fx = Fixture::new();
        let directory = UserDirectory::new(fx.store.clone());
        let user = directory.register_user(input("walt")).unwrap();

        let logged_in = directory.record_login(user.id).unwrap();
        assert!(logged_in.last_login_at.is_some());
        assert_eq!(logged_in.version, 2);

        assert!(matches!(
            directory.record_login(UserId::new(77)),
            Err(LifecycleError::NotFound(_))
        ));
    }

    #[test]
    fn users_with_orders_cannot_be_deleted() {
        let fx = Fixture::new();
        let directory = UserDirectory::new(fx.store.clone());
        let keeper = fx.user("xena");
        fx.order(keeper);
        let leaver = fx.user("yuri");

        assert!(matches!(
            directory.delete_user(keeper),
            Err(LifecycleError::Conflict(_))
        ));
        directory.delete_user(leaver).unwrap();
        assert!(matches!(
            directory.delete_user(leaver),
            Err(LifecycleError::NotFound(_))
        ));
    }
}
