// HTTP routers, handlers and middleware
pub mod api;

// Environment configuration
pub mod config;

// AES-256-GCM encryption for stored access tokens
pub mod crypto;

// Ephemeral OAuth handshake sessions
pub mod session;

// SQLite persistence (users, projects, issues, notes)
pub mod storage;

// Signed session tokens
pub mod token;
