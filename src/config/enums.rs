//! Closed, named sets of values read from strings.

/// A Rust enum readable from configuration strings by exact member name.
///
/// ```
/// use layerconf::config::ConfigEnum;
///
/// #[derive(Debug, Clone, Copy, PartialEq, Eq)]
/// enum UserStatus {
///     Active,
///     Banned,
/// }
///
/// impl ConfigEnum for UserStatus {
///     const NAME: &'static str = "UserStatus";
///     const MEMBERS: &'static [(&'static str, Self)] =
///         &[("ACTIVE", UserStatus::Active), ("BANNED", UserStatus::Banned)];
/// }
///
/// assert_eq!(UserStatus::from_name("BANNED"), Some(UserStatus::Banned));
/// assert_eq!(UserStatus::from_name("banned"), None);
/// ```
pub trait ConfigEnum: Sized + Copy + 'static {
    /// Name of the set, used in error messages.
    const NAME: &'static str;
    /// Every member with its configuration name, in declaration order.
    const MEMBERS: &'static [(&'static str, Self)];

    fn from_name(name: &str) -> Option<Self> {
        Self::MEMBERS
            .iter()
            .find(|(member, _)| *member == name)
            .map(|(_, value)| *value)
    }

    fn enum_set() -> EnumSet {
        EnumSet::new(Self::NAME, Self::MEMBERS.iter().map(|(name, _)| *name))
    }
}

/// A runtime description of an enum, for shapes built by hand.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnumSet {
    pub name: String,
    pub members: Vec<String>,
}

impl EnumSet {
    pub fn new<I, S>(name: impl Into<String>, members: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            name: name.into(),
            members: members.into_iter().map(Into::into).collect(),
        }
    }

    pub fn contains(&self, member: &str) -> bool {
        self.members.iter().any(|m| m == member)
    }
}
