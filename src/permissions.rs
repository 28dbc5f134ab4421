//! Permission View
//!
//! Read/write access to the ACL of one collection or data object, layered on
//! an established [`Session`]. Entries are fetched per query and never
//! cached.

use std::collections::BTreeMap;
use std::fmt::Write as _;

use tracing::{debug, warn};

use crate::client::{
    AclUpdate, ClientErrorKind, GridClient, GridConnection, ItemRef, PermissionEntry, ServerVersion,
};
use crate::error::{Result, SessionError};
use crate::session::{normalize, Session};

/// Servers before this release also accept the space-separated permission names
const LEGACY_PERMISSION_NAMES_BEFORE: ServerVersion = ServerVersion::new(4, 3, 0);

/// ACL accessor for a single item
pub struct Permissions<'s, C: GridClient> {
    session: &'s Session<C>,
    item: ItemRef,
}

impl<'s, C: GridClient> Permissions<'s, C> {
    /// View over an already resolved item
    pub fn new(session: &'s Session<C>, item: ItemRef) -> Self {
        Self { session, item }
    }

    /// Resolve `path` as a collection, falling back to a data object
    pub fn for_path(session: &'s Session<C>, path: &str) -> Result<Self> {
        let connection = session.connection().ok_or(SessionError::NotConnected)?;

        let item = match connection.collection(path) {
            Ok(item) => item,
            Err(e) if e.kind == ClientErrorKind::CollectionDoesNotExist => {
                debug!("{} is not a collection, trying data object", path);
                connection.data_object(path).map_err(normalize)?
            }
            Err(e) => return Err(normalize(e)),
        };

        Ok(Self::new(session, item))
    }

    /// Item this view is attached to
    pub fn item(&self) -> &ItemRef {
        &self.item
    }

    fn connection(&self) -> Result<&'s dyn GridConnection> {
        self.session.connection().ok_or(SessionError::NotConnected)
    }

    /// Current ACL entries
    pub fn entries(&self) -> Result<Vec<PermissionEntry>> {
        self.connection()?.acls(&self.item).map_err(normalize)
    }

    /// Permission names the server understands, mapped to their short form
    pub fn available_permissions(&self) -> Result<BTreeMap<String, String>> {
        let connection = self.connection()?;
        if let Some(permissions) = connection.available_permissions() {
            return Ok(permissions);
        }

        let mut permissions: BTreeMap<String, String> = [
            ("null", "none"),
            ("read_object", "read"),
            ("modify_object", "write"),
            ("own", "own"),
        ]
        .into_iter()
        .map(|(name, short)| (name.to_string(), short.to_string()))
        .collect();

        if self.session.server_version()? < LEGACY_PERMISSION_NAMES_BEFORE {
            permissions.insert("read object".to_string(), "read".to_string());
            permissions.insert("modify object".to_string(), "write".to_string());
        }

        Ok(permissions)
    }

    /// Grant `permission` on this item to `user#zone`
    ///
    /// An empty `zone` means the local zone. `recursive` applies to a
    /// collection's contents, `admin` acts with rodsadmin privileges.
    pub fn set(
        &self,
        permission: &str,
        user: &str,
        zone: &str,
        recursive: bool,
        admin: bool,
    ) -> Result<()> {
        let update = AclUpdate {
            access_name: permission.to_string(),
            path: self.item.path.clone(),
            user_name: user.to_string(),
            user_zone: zone.to_string(),
        };

        match self.connection()?.set_acl(&update, recursive, admin) {
            Ok(()) => {
                debug!("Set '{}' for {}#{} on {}", permission, user, zone, self.item.path);
                Ok(())
            }
            Err(e) if e.kind == ClientErrorKind::InvalidUser => {
                warn!("ACL error: user {} unknown", user);
                Err(SessionError::AclUnknownUser(user.to_string()))
            }
            Err(e) if e.kind == ClientErrorKind::InvalidArgument => {
                warn!(
                    "ACL error: permission {} or path {} not known",
                    permission, self.item.path
                );
                Err(SessionError::AclInvalidArgument {
                    permission: permission.to_string(),
                    path: self.item.path.clone(),
                })
            }
            Err(e) => Err(normalize(e)),
        }
    }

    /// Human-readable ACL listing
    ///
    /// ```text
    /// alice#tempZone
    ///         own     rodsuser
    /// research#tempZone
    ///         read_object     rodsgroup
    /// inheritance false
    /// ```
    pub fn describe(&self) -> Result<String> {
        let mut grouped: BTreeMap<String, Vec<String>> = BTreeMap::new();
        for entry in self.entries()? {
            grouped
                .entry(format!("{}#{}", entry.user_name, entry.user_zone))
                .or_default()
                .push(format!("{}\t{}", entry.access_name, entry.user_type));
        }

        let mut listing = String::new();
        for (key, lines) in &grouped {
            writeln!(listing, "{}\n\t{}", key, lines.join("\n\t")).ok();
        }

        if self.item.is_collection() {
            let inheritance = self.connection()?.inheritance(&self.item).map_err(normalize)?;
            writeln!(listing, "inheritance {}", inheritance).ok();
        }

        Ok(listing)
    }
}
