//! Scheme option assembly
//!
//! Listener and sender endpoints carry backend-specific knobs: SFTP
//! identities, FTP passive mode, FTPS protection levels, TLS material and
//! transfer file types. This module normalizes them from two sources,
//! the URI query string and a configuration source, into a single
//! [`BackendOptions`] object that [`FileSystemBackend`](crate::backend::FileSystemBackend)
//! implementations accept when resolving files.
//!
//! # Assembly pipeline
//!
//! 1. [`parse_scheme_file_options`] extracts the scheme and query
//!    parameters, then overlays configured SFTP options.
//! 2. [`build_backend_options`] translates the merged map into the typed
//!    options object.
//!
//! [`assemble`] runs both steps.

use crate::uri;
use serde::Deserialize;
use std::collections::HashMap;

/// Map entry recording the URI scheme
pub const SCHEME: &str = "scheme";
/// FTP/FTPS passive mode flag
pub const PASSIVE_MODE: &str = "vfs.passive";
/// FTPS implicit mode flag
pub const IMPLICIT_MODE: &str = "vfs.implicit";
/// FTPS data-channel protection level (`P`/`C`/`S`/`E`)
pub const PROTECTION_MODE: &str = "vfs.protection";
/// Transfer file type (`ASCII`/`BINARY`/`EBCDIC`/`LOCAL`)
pub const FILE_TYPE: &str = "fileType";
/// Prefix for configured SFTP option keys, e.g. `sftpIdentities`
pub const SFTP_PREFIX: &str = "sftp";

const KEY_STORE: &str = "vfs.ssl.keystore";
const TRUST_STORE: &str = "vfs.ssl.truststore";
const KS_PASSWD: &str = "vfs.ssl.kspassword";
const TS_PASSWD: &str = "vfs.ssl.tspassword";
const KEY_PASSWD: &str = "vfs.ssl.keypassword";

/// Per-endpoint SFTP options
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SftpOption {
    /// Private-key identity files
    Identities,
    /// Treat the user's home directory as the path root
    UserDirIsRoot,
    /// Passphrase protecting the identity files
    IdentityPassPhrase,
}

impl SftpOption {
    /// Every known SFTP option
    pub const ALL: [SftpOption; 3] = [
        SftpOption::Identities,
        SftpOption::UserDirIsRoot,
        SftpOption::IdentityPassPhrase,
    ];

    /// TitleCase name used in merged option maps and, prefixed with
    /// [`SFTP_PREFIX`], as the configuration lookup key
    pub fn as_str(&self) -> &'static str {
        match self {
            SftpOption::Identities => "Identities",
            SftpOption::UserDirIsRoot => "UserDirIsRoot",
            SftpOption::IdentityPassPhrase => "IdentityPassPhrase",
        }
    }
}

/// Transfer file type for FTP-family backends
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FileType {
    /// ASCII text transfer
    Ascii,
    /// Binary transfer (the default)
    #[default]
    Binary,
    /// EBCDIC text transfer
    Ebcdic,
    /// Local byte-size transfer
    Local,
}

impl FileType {
    /// Parse a configured value case-insensitively, defaulting to binary
    pub fn parse(value: &str) -> Self {
        match value.to_uppercase().as_str() {
            "ASCII" => FileType::Ascii,
            "EBCDIC" => FileType::Ebcdic,
            "LOCAL" => FileType::Local,
            _ => FileType::Binary,
        }
    }

    /// The backend's integer code for this file type
    pub fn ftp_code(self) -> i32 {
        match self {
            FileType::Ascii => 0,
            FileType::Ebcdic => 1,
            FileType::Binary => 2,
            FileType::Local => 3,
        }
    }
}

/// FTPS data-channel protection level
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProtectionLevel {
    /// The `C` (clear) level
    Clear,
    /// The `S` (safe) level
    Safe,
    /// The `E` (confidential) level
    Confidential,
    /// The `P` (private) level
    Private,
}

impl ProtectionLevel {
    /// Parse the single-letter flag case-insensitively
    ///
    /// Unrecognized values yield `None`, leaving the backend default in
    /// place.
    pub fn from_flag(value: &str) -> Option<Self> {
        match value.to_uppercase().as_str() {
            "C" => Some(ProtectionLevel::Clear),
            "S" => Some(ProtectionLevel::Safe),
            "E" => Some(ProtectionLevel::Confidential),
            "P" => Some(ProtectionLevel::Private),
            _ => None,
        }
    }
}

/// TLS material for FTPS connections
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TlsMaterial {
    /// Keystore path
    pub keystore: Option<String>,
    /// Truststore path
    pub truststore: Option<String>,
    /// Keystore password
    pub keystore_password: Option<String>,
    /// Truststore password
    pub truststore_password: Option<String>,
    /// Key password
    pub key_password: Option<String>,
}

/// Typed backend options handed to a file-system backend
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BackendOptions {
    scheme: Option<String>,
    sftp: HashMap<String, String>,
    ftp_passive: Option<bool>,
    ftps_implicit: bool,
    ftps_protection: Option<ProtectionLevel>,
    tls: TlsMaterial,
    file_type: Option<FileType>,
}

impl BackendOptions {
    /// The scheme these options were assembled for
    pub fn scheme(&self) -> Option<&str> {
        self.scheme.as_deref()
    }

    /// SFTP options, keyed by lowercased option name
    pub fn sftp_options(&self) -> &HashMap<String, String> {
        &self.sftp
    }

    /// FTP/FTPS passive mode, if configured
    pub fn ftp_passive(&self) -> Option<bool> {
        self.ftp_passive
    }

    /// Whether FTPS runs in implicit mode
    pub fn ftps_implicit(&self) -> bool {
        self.ftps_implicit
    }

    /// FTPS data-channel protection level, if configured
    pub fn ftps_protection(&self) -> Option<ProtectionLevel> {
        self.ftps_protection
    }

    /// TLS material for FTPS
    pub fn tls(&self) -> &TlsMaterial {
        &self.tls
    }

    /// Configured transfer file type
    pub fn file_type(&self) -> Option<FileType> {
        self.file_type
    }

    /// Backend integer code for the transfer file type, binary when unset
    pub fn file_type_code(&self) -> i32 {
        self.file_type.unwrap_or_default().ftp_code()
    }
}

/// A configuration source the assembler can look options up in
pub trait OptionLookup {
    /// Fetch a configured value by key
    fn get(&self, key: &str) -> Option<String>;
}

impl OptionLookup for HashMap<String, String> {
    fn get(&self, key: &str) -> Option<String> {
        HashMap::get(self, key).cloned()
    }
}

/// A structured parameter bag, deserializable from a JSON properties map
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(transparent)]
pub struct ParameterBag(HashMap<String, String>);

impl ParameterBag {
    /// Create an empty bag
    pub fn new() -> Self {
        Self::default()
    }

    /// Set a parameter, replacing any previous value
    pub fn set(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.0.insert(key.into(), value.into());
    }
}

impl OptionLookup for ParameterBag {
    fn get(&self, key: &str) -> Option<String> {
        self.0.get(key).cloned()
    }
}

/// Parse scheme-specific options for a file URI into a key/value map
///
/// Returns `None` when the URI carries no scheme. The map records the
/// scheme itself under [`SCHEME`], every query parameter, and every
/// non-empty configured SFTP option (looked up as
/// `<prefix><TitleCase(option)>`, e.g. `sftpIdentities`).
pub fn parse_scheme_file_options(
    file_uri: &str,
    source: &dyn OptionLookup,
) -> Option<HashMap<String, String>> {
    let scheme = uri::extract_scheme(file_uri)?;
    let mut merged = uri::parse_query_params(file_uri);
    merged.insert(SCHEME.to_string(), scheme.to_string());
    for option in SftpOption::ALL {
        let lookup_key = format!("{SFTP_PREFIX}{}", option.as_str());
        if let Some(value) = source.get(&lookup_key) {
            if !value.is_empty() {
                merged.insert(option.as_str().to_string(), value);
            }
        }
    }
    Some(merged)
}

/// Build the typed backend options from a merged option map
pub fn build_backend_options(options: &HashMap<String, String>) -> BackendOptions {
    let mut built = BackendOptions {
        scheme: options.get(SCHEME).cloned(),
        ..BackendOptions::default()
    };

    for option in SftpOption::ALL {
        if let Some(value) = options.get(option.as_str()) {
            built
                .sftp
                .insert(option.as_str().to_lowercase(), value.clone());
        }
    }

    if let Some(passive) = options.get(PASSIVE_MODE) {
        built.ftp_passive = Some(parse_bool(passive));
    }
    if let Some(implicit) = options.get(IMPLICIT_MODE) {
        if parse_bool(implicit) {
            built.ftps_implicit = true;
        }
    }
    if let Some(protection) = options.get(PROTECTION_MODE) {
        built.ftps_protection = ProtectionLevel::from_flag(protection);
    }

    built.tls.keystore = options.get(KEY_STORE).cloned();
    built.tls.truststore = options.get(TRUST_STORE).cloned();
    built.tls.keystore_password = options.get(KS_PASSWD).cloned();
    built.tls.truststore_password = options.get(TS_PASSWD).cloned();
    built.tls.key_password = options.get(KEY_PASSWD).cloned();

    if let Some(file_type) = options.get(FILE_TYPE) {
        built.file_type = Some(FileType::parse(file_type));
    }

    built
}

/// Assemble backend options for a file URI in one step
///
/// Returns `None` when the URI carries no scheme.
pub fn assemble(file_uri: &str, source: &dyn OptionLookup) -> Option<BackendOptions> {
    parse_scheme_file_options(file_uri, source).map(|merged| build_backend_options(&merged))
}

fn parse_bool(value: &str) -> bool {
    value.eq_ignore_ascii_case("true")
}
