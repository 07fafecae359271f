use std::fs;
use std::io;
use std::path::PathBuf;
use std::sync::{Arc, Mutex, RwLock};

use colorful::Color;
use colorful::Colorful;

use crate::errors::MeepleError;
use crate::structs::client::Client;
use crate::structs::{LoginSuccess, User};

/// The client's authentication state. Owned by [`SessionManager`]; every
/// other component reads snapshots.
///
/// `current_user` is set if and only if `token` is set: both come from the
/// same server response (login, registration, or identity refresh).
#[derive(Default, Debug, Clone)]
pub struct Session {
    /// Opaque bearer token for authenticated calls, if signed in.
    pub token: Option<String>,
    /// Identity behind the token, if signed in.
    pub current_user: Option<User>,
    /// True until the cold-start restore has resolved.
    pub loading: bool,
}

impl Session {
    /// Whether the session currently holds an authenticated identity.
    pub fn is_authenticated(&self) -> bool {
        self.token.is_some()
    }
}

/// The authentication calls the session manager needs from the API.
///
/// [`Client`] implements this; tests substitute a fake.
pub trait AuthApi: Send + Sync {
    fn login(&self, username: &str, password: &str) -> Result<LoginSuccess, MeepleError>;
    fn register(
        &self,
        username: &str,
        password: &str,
        confirm: &str,
    ) -> Result<LoginSuccess, MeepleError>;
    fn me(&self, token: &str) -> Result<User, MeepleError>;
}

impl AuthApi for Client {
    fn login(&self, username: &str, password: &str) -> Result<LoginSuccess, MeepleError> {
        self.login(username, password)
    }

    fn register(
        &self,
        username: &str,
        password: &str,
        confirm: &str,
    ) -> Result<LoginSuccess, MeepleError> {
        self.register(username, password, confirm)
    }

    fn me(&self, token: &str) -> Result<User, MeepleError> {
        self.me(token)
    }
}

/// Durable storage for the bearer token.
///
/// Exactly one value lives under one fixed key; the session manager is its
/// sole writer. The token survives process restarts until an explicit
/// sign-out or a failed restore removes it.
pub trait TokenStore: Send + Sync {
    /// Reads the persisted token, if any.
    fn load(&self) -> Option<String>;
    /// Persists the token, replacing any previous value.
    fn save(&self, token: &str) -> Result<(), MeepleError>;
    /// Removes the persisted token. Removing an absent token is not an error.
    fn clear(&self) -> Result<(), MeepleError>;
}

impl<S: TokenStore + ?Sized> TokenStore for Arc<S> {
    fn load(&self) -> Option<String> {
        (**self).load()
    }

    fn save(&self, token: &str) -> Result<(), MeepleError> {
        (**self).save(token)
    }

    fn clear(&self) -> Result<(), MeepleError> {
        (**self).clear()
    }
}

/// Token store backed by a single file on disk.
#[derive(Debug, Clone)]
pub struct FileTokenStore {
    path: PathBuf,
}

impl FileTokenStore {
    /// Creates a store persisting the token at `path`. Parent directories
    /// are created on the first save.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl TokenStore for FileTokenStore {
    fn load(&self) -> Option<String> {
        let raw = fs::read_to_string(&self.path).ok()?;
        let token = raw.trim().to_string();
        if token.is_empty() {
            None
        } else {
            Some(token)
        }
    }

    fn save(&self, token: &str) -> Result<(), MeepleError> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).or(Err(MeepleError::StorageFailed))?;
        }
        fs::write(&self.path, token).or(Err(MeepleError::StorageFailed))
    }

    fn clear(&self) -> Result<(), MeepleError> {
        match fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(_) => Err(MeepleError::StorageFailed),
        }
    }
}

/// In-memory token store. Useful in tests and ephemeral environments.
#[derive(Default, Debug)]
pub struct MemoryTokenStore {
    token: Mutex<Option<String>>,
}

impl TokenStore for MemoryTokenStore {
    fn load(&self) -> Option<String> {
        self.token
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    fn save(&self, token: &str) -> Result<(), MeepleError> {
        *self.token.lock().unwrap_or_else(|e| e.into_inner()) = Some(token.to_string());
        Ok(())
    }

    fn clear(&self) -> Result<(), MeepleError> {
        *self.token.lock().unwrap_or_else(|e| e.into_inner()) = None;
        Ok(())
    }
}

type Listener = Box<dyn Fn(&Session) + Send + Sync>;

/// Owns the single source of truth for "who is signed in".
///
/// The manager is the sole writer of the [`Session`] record and of the token
/// store. Consumers read snapshots via [`session()`](Self::session) or
/// register change callbacks via [`subscribe()`](Self::subscribe).
///
/// Two sign-in attempts running concurrently are not mutually excluded: the
/// lock is only held while a completed result is applied, so whichever
/// response resolves last wins. Callers serialize attempts themselves, e.g.
/// by disabling the triggering control while one is in flight.
pub struct SessionManager {
    api: Box<dyn AuthApi>,
    store: Box<dyn TokenStore>,
    state: RwLock<Session>,
    listeners: Mutex<Vec<Listener>>,
    /// Whether the manager should print debug statements.
    pub debug: bool,
}

impl SessionManager {
    /// Creates a manager in the `Restoring` state (`loading == true`).
    /// Call [`restore()`](Self::restore) once at startup to resolve it.
    pub fn new(api: impl AuthApi + 'static, store: impl TokenStore + 'static) -> Self {
        Self {
            api: Box::new(api),
            store: Box::new(store),
            state: RwLock::new(Session {
                token: None,
                current_user: None,
                loading: true,
            }),
            listeners: Mutex::new(Vec::new()),
            debug: false,
        }
    }

    /// Runs the one-time cold-start restore.
    ///
    /// Reads the persisted token and validates it against the identity
    /// endpoint. A valid token yields an authenticated session; a rejected
    /// token is deleted and the session comes up anonymous. Either way
    /// `loading` resolves to false. Running restore again with no persisted
    /// token is a no-op that stays anonymous.
    pub fn restore(&self) {
        match self.store.load() {
            Some(token) => match self.api.me(&token) {
                Ok(user) => {
                    self.debug_print(&format!("[AUTH] Welcome back, {}.", user.username));
                    self.apply(Some(token), Some(user));
                }
                Err(_) => {
                    // Stale token: drop it and come up anonymous.
                    self.debug_print("[AUTH] Persisted session rejected. Signing out.");
                    let _ = self.store.clear();
                    self.apply(None, None);
                }
            },
            None => self.apply(None, None),
        }
    }

    /// Signs the user in. On success the token, the current user and the
    /// persisted store all update together.
    pub fn sign_in(&self, username: &str, password: &str) -> Result<(), MeepleError> {
        self.debug_print("[AUTH] Signing in...");
        let data = self.api.login(username, password)?;
        self.store.save(&data.token)?;
        self.debug_print(&format!("[AUTH] Welcome, {}.", data.user.username));
        self.apply(Some(data.token), Some(data.user));
        Ok(())
    }

    /// Registers a new account and signs it in. Same contract as
    /// [`sign_in()`](Self::sign_in).
    pub fn sign_up(
        &self,
        username: &str,
        password: &str,
        confirm: &str,
    ) -> Result<(), MeepleError> {
        self.debug_print("[AUTH] Registering...");
        let data = self.api.register(username, password, confirm)?;
        self.store.save(&data.token)?;
        self.debug_print(&format!("[AUTH] Welcome, {}.", data.user.username));
        self.apply(Some(data.token), Some(data.user));
        Ok(())
    }

    /// Clears the session and the persisted token. Always succeeds locally,
    /// even when the token store cannot be written.
    pub fn sign_out(&self) {
        self.debug_print("[AUTH] Signing out.");
        let _ = self.store.clear();
        self.apply(None, None);
    }

    /// Snapshot of the current session.
    pub fn session(&self) -> Session {
        self.state
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    /// Registers a callback fired after every session transition.
    pub fn subscribe(&self, listener: impl Fn(&Session) + Send + Sync + 'static) {
        self.listeners
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(Box::new(listener));
    }

    fn apply(&self, token: Option<String>, user: Option<User>) {
        let snapshot = {
            let mut state = self.state.write().unwrap_or_else(|e| e.into_inner());
            state.token = token;
            state.current_user = user;
            state.loading = false;
            state.clone()
        };

        let listeners = self.listeners.lock().unwrap_or_else(|e| e.into_inner());
        for listener in listeners.iter() {
            listener(&snapshot);
        }
    }

    fn debug_print(&self, message: &str) {
        if !self.debug {
            return;
        }

        #[cfg(windows)]
        println!("{}", message);

        #[cfg(not(windows))]
        println!(
            "{}",
            message.gradient_with_color(Color::Cyan, Color::SpringGreen4)
        );
    }
}
