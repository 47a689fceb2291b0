//! ViewName - Cheap-to-clone view identifier
//!
//! Uses Arc<str> internally; every callback and record clones it.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::borrow::Borrow;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::ops::Deref;
use std::sync::Arc;

/// View identifier `"{camera_name}_to_{sector_name}"`.
///
/// # Examples
/// ```
/// use contracts::ViewName;
///
/// let view = ViewName::compose("left", "main");
/// assert_eq!(view.as_str(), "left_to_main");
/// assert_eq!(ViewName::center("main"), "main_to_main");
/// ```
#[derive(Clone, Default)]
pub struct ViewName(Arc<str>);

impl ViewName {
    /// Build the name of `camera_name` inside `sector_name`
    pub fn compose(camera_name: &str, sector_name: &str) -> Self {
        Self(Arc::from(format!("{camera_name}_to_{sector_name}")))
    }

    /// Name of the sector's center view
    pub fn center(sector_name: &str) -> Self {
        Self::compose(sector_name, sector_name)
    }

    /// Get the underlying string slice.
    #[inline]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Rear-mounted views flip the yaw sign relative to the rig convention
    pub fn is_rear(&self) -> bool {
        self.0.contains("rear")
    }
}

impl Deref for ViewName {
    type Target = str;

    #[inline]
    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl AsRef<str> for ViewName {
    #[inline]
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl Borrow<str> for ViewName {
    #[inline]
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl From<&str> for ViewName {
    #[inline]
    fn from(s: &str) -> Self {
        Self(Arc::from(s))
    }
}

impl From<String> for ViewName {
    #[inline]
    fn from(s: String) -> Self {
        Self(Arc::from(s))
    }
}

impl fmt::Display for ViewName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl fmt::Debug for ViewName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ViewName({:?})", self.0)
    }
}

impl PartialEq for ViewName {
    #[inline]
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.0, &other.0) || self.0 == other.0
    }
}

impl Eq for ViewName {}

impl PartialEq<str> for ViewName {
    #[inline]
    fn eq(&self, other: &str) -> bool {
        self.0.as_ref() == other
    }
}

impl PartialEq<&str> for ViewName {
    #[inline]
    fn eq(&self, other: &&str) -> bool {
        self.0.as_ref() == *other
    }
}

// Same hash as str so HashMap lookups by &str work
impl Hash for ViewName {
    #[inline]
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.0.hash(state)
    }
}

impl Serialize for ViewName {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&self.0)
    }
}

impl<'de> Deserialize<'de> for ViewName {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        Ok(Self::from(s))
    }
}
