//! Filter, sort and pagination parameters for listings.
//!
//! Raw query-string values are turned into bounded, typed parameters here so
//! that the SQL layer only ever sees:
//! - sort columns taken from a fixed allow-list of static strings
//! - text filters as escaped `ILIKE` substring patterns
//! - page sizes clamped to [`MAX_PAGE_SIZE`]

use crate::identity::Identity;
use crate::policy::Denial;
use crate::types::{Role, Score, StoreId, UserId};
use crate::validation::{self, ValidationErrors};

/// Page size used when none is requested.
pub const DEFAULT_PAGE_SIZE: u32 = 50;
/// Largest page a client may request.
pub const MAX_PAGE_SIZE: u32 = 500;

/// A 1-indexed page of results.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Page {
    number: u32,
    size: u32,
}

impl Default for Page {
    fn default() -> Self {
        Self {
            number: 1,
            size: DEFAULT_PAGE_SIZE,
        }
    }
}

impl Page {
    /// Build a page, clamping the number to at least 1 and the size to
    /// `1..=MAX_PAGE_SIZE`.
    #[must_use]
    pub fn new(number: i64, size: i64) -> Self {
        let number = u32::try_from(number.max(1)).unwrap_or(u32::MAX);
        let size = u32::try_from(size.clamp(1, i64::from(MAX_PAGE_SIZE))).unwrap_or(MAX_PAGE_SIZE);
        Self { number, size }
    }

    /// Parse `page` and `size` query values. Missing values take defaults.
    ///
    /// # Errors
    ///
    /// Returns an error citing the field when a value is not an integer.
    pub fn parse(page: Option<&str>, size: Option<&str>) -> Result<Self, ValidationErrors> {
        let mut errors = ValidationErrors::new();
        let number = parse_int(&mut errors, "page", page).unwrap_or(1);
        let size = parse_int(&mut errors, "size", size).unwrap_or(i64::from(DEFAULT_PAGE_SIZE));
        if errors.is_empty() {
            Ok(Self::new(number, size))
        } else {
            Err(errors)
        }
    }

    /// The 1-indexed page number.
    #[must_use]
    pub const fn number(&self) -> u32 {
        self.number
    }

    /// Rows per page.
    #[must_use]
    pub const fn size(&self) -> u32 {
        self.size
    }

    /// SQL `LIMIT`.
    #[must_use]
    pub fn limit(&self) -> i64 {
        i64::from(self.size)
    }

    /// SQL `OFFSET`: `(page - 1) * size`.
    #[must_use]
    pub fn offset(&self) -> i64 {
        (i64::from(self.number) - 1) * i64::from(self.size)
    }
}

fn parse_int(errors: &mut ValidationErrors, field: &'static str, raw: Option<&str>) -> Option<i64> {
    let raw = raw.map(str::trim).filter(|r| !r.is_empty())?;
    match raw.parse::<i64>() {
        Ok(value) => Some(value),
        Err(_) => {
            errors.add(field, format!("{field} must be an integer"));
            None
        }
    }
}

/// Sort direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortOrder {
    Asc,
    Desc,
}

impl SortOrder {
    /// Parse `asc`/`desc` (any case), falling back to `default`.
    #[must_use]
    pub fn parse(raw: Option<&str>, default: Self) -> Self {
        match raw.map(str::to_ascii_lowercase).as_deref() {
            Some("asc") => Self::Asc,
            Some("desc") => Self::Desc,
            _ => default,
        }
    }

    /// SQL keyword.
    #[must_use]
    pub const fn as_sql(self) -> &'static str {
        match self {
            Self::Asc => "ASC",
            Self::Desc => "DESC",
        }
    }
}

/// A sortable column allow-list.
pub trait SortKey: Copy + Sized {
    /// Column used when the requested key is missing or unknown.
    const DEFAULT: Self;
    /// Direction used when the requested order is missing or unknown.
    const DEFAULT_ORDER: SortOrder;

    /// Map a client-supplied key to an allowed column.
    fn from_key(key: &str) -> Option<Self>;

    /// The SQL expression for this column. Always a static string.
    fn column(self) -> &'static str;
}

/// A resolved sort: an allowed column plus a direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Sort<K> {
    pub key: K,
    pub order: SortOrder,
}

impl<K: SortKey> Sort<K> {
    /// Resolve raw `sort`/`order` values; unknown keys use the default column.
    #[must_use]
    pub fn parse(sort: Option<&str>, order: Option<&str>) -> Self {
        Self {
            key: sort.and_then(K::from_key).unwrap_or(K::DEFAULT),
            order: SortOrder::parse(order, K::DEFAULT_ORDER),
        }
    }

    /// `ORDER BY` body, e.g. `u.name ASC`.
    #[must_use]
    pub fn to_sql(&self) -> String {
        format!("{} {}", self.key.column(), self.order.as_sql())
    }
}

impl<K: SortKey> Default for Sort<K> {
    fn default() -> Self {
        Self::parse(None, None)
    }
}

/// Sortable account columns.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UserSort {
    Name,
    Email,
    Address,
    Role,
    CreatedAt,
}

impl SortKey for UserSort {
    const DEFAULT: Self = Self::Name;
    const DEFAULT_ORDER: SortOrder = SortOrder::Asc;

    fn from_key(key: &str) -> Option<Self> {
        match key {
            "name" => Some(Self::Name),
            "email" => Some(Self::Email),
            "address" => Some(Self::Address),
            "role" => Some(Self::Role),
            "created_at" => Some(Self::CreatedAt),
            _ => None,
        }
    }

    fn column(self) -> &'static str {
        match self {
            Self::Name => "u.name",
            Self::Email => "u.email",
            Self::Address => "u.address",
            Self::Role => "u.role",
            Self::CreatedAt => "u.created_at",
        }
    }
}

/// Sortable store columns.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreSort {
    Name,
    Address,
    Rating,
}

impl SortKey for StoreSort {
    const DEFAULT: Self = Self::Name;
    const DEFAULT_ORDER: SortOrder = SortOrder::Asc;

    fn from_key(key: &str) -> Option<Self> {
        match key {
            "name" => Some(Self::Name),
            "address" => Some(Self::Address),
            "rating" => Some(Self::Rating),
            _ => None,
        }
    }

    fn column(self) -> &'static str {
        match self {
            Self::Name => "s.name",
            Self::Address => "s.address",
            Self::Rating => "overall_rating",
        }
    }
}

/// Sortable rating columns.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RatingSort {
    CreatedAt,
    Rating,
}

impl SortKey for RatingSort {
    const DEFAULT: Self = Self::CreatedAt;
    const DEFAULT_ORDER: SortOrder = SortOrder::Desc;

    fn from_key(key: &str) -> Option<Self> {
        match key {
            "created_at" => Some(Self::CreatedAt),
            "rating" => Some(Self::Rating),
            _ => None,
        }
    }

    fn column(self) -> &'static str {
        match self {
            Self::CreatedAt => "r.created_at",
            Self::Rating => "r.rating",
        }
    }
}

/// Turn free text into an `ILIKE` pattern matching it as a substring.
///
/// `%`, `_` and `\` in the input are escaped so they match literally.
/// Blank input yields `None` (no filter).
#[must_use]
pub fn contains_pattern(raw: Option<&str>) -> Option<String> {
    let needle = raw.map(str::trim).filter(|r| !r.is_empty())?;
    let mut pattern = String::with_capacity(needle.len() + 2);
    pattern.push('%');
    for c in needle.chars() {
        if matches!(c, '%' | '_' | '\\') {
            pattern.push('\\');
        }
        pattern.push(c);
    }
    pattern.push('%');
    Some(pattern)
}

/// Account listing filters.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UserFilter {
    pub name: Option<String>,
    pub email: Option<String>,
    pub address: Option<String>,
    pub role: Option<Role>,
}

impl UserFilter {
    /// Build from raw query values.
    ///
    /// # Errors
    ///
    /// Returns an error citing `role` when it is not a known role.
    pub fn parse(
        name: Option<&str>,
        email: Option<&str>,
        address: Option<&str>,
        role: Option<&str>,
    ) -> Result<Self, ValidationErrors> {
        let role = match role.map(str::trim).filter(|r| !r.is_empty()) {
            Some(raw) => Some(
                raw.parse::<Role>()
                    .map_err(|e| ValidationErrors::single("role", e.to_string()))?,
            ),
            None => None,
        };

        Ok(Self {
            name: contains_pattern(name),
            email: contains_pattern(email),
            address: contains_pattern(address),
            role,
        })
    }
}

/// Store listing filters.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StoreFilter {
    pub name: Option<String>,
    pub address: Option<String>,
}

impl StoreFilter {
    /// Build from raw query values.
    #[must_use]
    pub fn parse(name: Option<&str>, address: Option<&str>) -> Self {
        Self {
            name: contains_pattern(name),
            address: contains_pattern(address),
        }
    }
}

/// Rating listing filters.
///
/// `user_id` here is the effective filter after [`rating_scope`] has been
/// applied, never the raw client value.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RatingFilter {
    pub user_id: Option<UserId>,
    pub store_id: Option<StoreId>,
    pub min: Option<Score>,
    pub max: Option<Score>,
    pub comment: Option<String>,
}

/// Raw rating-listing query values.
#[derive(Debug, Clone, Copy, Default)]
pub struct RatingQuery<'a> {
    pub user_id: Option<&'a str>,
    pub store_id: Option<&'a str>,
    pub min: Option<&'a str>,
    pub max: Option<&'a str>,
    pub comment: Option<&'a str>,
}

impl RatingFilter {
    /// Validate raw values and apply the requester's visibility scope.
    ///
    /// # Errors
    ///
    /// Returns field errors for malformed ids or bounds outside 1-5, and
    /// [`Denial::Forbidden`] when a non-administrator asks for another
    /// user's ratings.
    pub fn parse(requester: &Identity, raw: RatingQuery<'_>) -> Result<Self, RatingFilterError> {
        let mut errors = ValidationErrors::new();

        let requested_user = optional(raw.user_id)
            .map(|id| validation::id::<UserId>("user_id", id))
            .transpose()
            .unwrap_or_else(|e| {
                errors.merge(e);
                None
            });
        let store_id = optional(raw.store_id)
            .map(|id| validation::id::<StoreId>("store_id", id))
            .transpose()
            .unwrap_or_else(|e| {
                errors.merge(e);
                None
            });
        let min = bound(&mut errors, "min", raw.min);
        let max = bound(&mut errors, "max", raw.max);

        if !errors.is_empty() {
            return Err(RatingFilterError::Invalid(errors));
        }

        let user_id = rating_scope(requester, requested_user).map_err(RatingFilterError::Denied)?;

        Ok(Self {
            user_id,
            store_id,
            min,
            max,
            comment: contains_pattern(raw.comment),
        })
    }
}

/// Why a rating filter could not be built.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RatingFilterError {
    #[error(transparent)]
    Invalid(ValidationErrors),
    #[error(transparent)]
    Denied(Denial),
}

fn optional(raw: Option<&str>) -> Option<&str> {
    raw.map(str::trim).filter(|r| !r.is_empty())
}

fn bound(errors: &mut ValidationErrors, field: &'static str, raw: Option<&str>) -> Option<Score> {
    let value = parse_int(errors, field, raw)?;
    match Score::new(value) {
        Ok(score) => Some(score),
        Err(e) => {
            errors.add(field, e.to_string());
            None
        }
    }
}

/// Resolve which user's ratings a requester may list.
///
/// - administrators get exactly what they asked for (`None` = everyone)
/// - anyone else asking for nothing is scoped to their own ratings
/// - anyone else asking for their own id gets it
/// - anyone else asking for a different id is refused
///
/// # Errors
///
/// Returns [`Denial::Forbidden`] for the last case.
pub fn rating_scope(
    requester: &Identity,
    requested: Option<UserId>,
) -> Result<Option<UserId>, Denial> {
    if requester.is_admin() {
        return Ok(requested);
    }
    match requested {
        None => Ok(Some(requester.id)),
        Some(id) if id == requester.id => Ok(Some(id)),
        Some(_) => Err(Denial::Forbidden),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::types::Email;

    fn identity(role: Role) -> Identity {
        Identity {
            id: UserId::generate(),
            email: Email::parse("someone@example.com").unwrap(),
            role,
            name: "Someone With A Long Enough Name".to_owned(),
        }
    }

    #[test]
    fn test_page_defaults_and_offset() {
        let page = Page::parse(None, None).unwrap();
        assert_eq!(page, Page::default());
        assert_eq!(page.offset(), 0);
        assert_eq!(page.limit(), 50);

        let page = Page::parse(Some("3"), Some("20")).unwrap();
        assert_eq!(page.offset(), 40);
    }

    #[test]
    fn test_page_clamps() {
        let page = Page::new(0, 10_000);
        assert_eq!(page.number(), 1);
        assert_eq!(page.size(), MAX_PAGE_SIZE);

        let page = Page::new(-5, 0);
        assert_eq!(page.number(), 1);
        assert_eq!(page.size(), 1);
    }

    #[test]
    fn test_page_rejects_non_integers() {
        let err = Page::parse(Some("two"), Some("ten")).unwrap_err();
        assert!(err.has("page"));
        assert!(err.has("size"));
    }

    #[test]
    fn test_sort_defaults_per_listing() {
        assert_eq!(Sort::<UserSort>::default().to_sql(), "u.name ASC");
        assert_eq!(Sort::<StoreSort>::default().to_sql(), "s.name ASC");
        assert_eq!(Sort::<RatingSort>::default().to_sql(), "r.created_at DESC");
    }

    #[test]
    fn test_sort_allow_list() {
        let sort = Sort::<StoreSort>::parse(Some("rating"), Some("DESC"));
        assert_eq!(sort.to_sql(), "overall_rating DESC");

        let sort = Sort::<UserSort>::parse(Some("created_at"), Some("desc"));
        assert_eq!(sort.to_sql(), "u.created_at DESC");

        let sort = Sort::<RatingSort>::parse(Some("rating"), Some("asc"));
        assert_eq!(sort.to_sql(), "r.rating ASC");
    }

    #[test]
    fn test_sort_never_passes_through_unknown_input() {
        let hostile = "name; DROP TABLE users; --";
        let sort = Sort::<UserSort>::parse(Some(hostile), Some(hostile));
        assert_eq!(sort.to_sql(), "u.name ASC");

        let sort = Sort::<RatingSort>::parse(Some("password_hash"), Some("sideways"));
        assert_eq!(sort.to_sql(), "r.created_at DESC");
    }

    #[test]
    fn test_contains_pattern_escapes_wildcards() {
        assert_eq!(contains_pattern(None), None);
        assert_eq!(contains_pattern(Some("  ")), None);
        assert_eq!(contains_pattern(Some("Main St")).as_deref(), Some("%Main St%"));
        assert_eq!(contains_pattern(Some("100%_\\")).as_deref(), Some("%100\\%\\_\\\\%"));
    }

    #[test]
    fn test_user_filter_role() {
        let filter = UserFilter::parse(Some("ann"), None, None, Some("store_owner")).unwrap();
        assert_eq!(filter.role, Some(Role::StoreOwner));
        assert_eq!(filter.name.as_deref(), Some("%ann%"));
        assert!(UserFilter::parse(None, None, None, Some("superuser"))
            .unwrap_err()
            .has("role"));
    }

    #[test]
    fn test_rating_scope_admin_sees_what_they_ask_for() {
        let admin = identity(Role::SystemAdmin);
        let other = UserId::generate();
        assert_eq!(rating_scope(&admin, None), Ok(None));
        assert_eq!(rating_scope(&admin, Some(other)), Ok(Some(other)));
    }

    #[test]
    fn test_rating_scope_non_admin_defaults_to_self() {
        for role in [Role::NormalUser, Role::StoreOwner] {
            let who = identity(role);
            assert_eq!(rating_scope(&who, None), Ok(Some(who.id)));
            assert_eq!(rating_scope(&who, Some(who.id)), Ok(Some(who.id)));
        }
    }

    #[test]
    fn test_rating_scope_non_admin_foreign_id_is_forbidden() {
        let who = identity(Role::NormalUser);
        assert_eq!(
            rating_scope(&who, Some(UserId::generate())),
            Err(Denial::Forbidden)
        );
    }

    #[test]
    fn test_rating_filter_parse() {
        let who = identity(Role::NormalUser);
        let store = StoreId::generate();
        let filter = RatingFilter::parse(
            &who,
            RatingQuery {
                store_id: Some(&store.to_string()),
                min: Some("2"),
                max: Some("4"),
                comment: Some("great"),
                ..RatingQuery::default()
            },
        )
        .unwrap();
        assert_eq!(filter.user_id, Some(who.id));
        assert_eq!(filter.store_id, Some(store));
        assert_eq!(filter.min.map(Score::value), Some(2));
        assert_eq!(filter.max.map(Score::value), Some(4));
        assert_eq!(filter.comment.as_deref(), Some("%great%"));
    }

    #[test]
    fn test_rating_filter_bounds_must_be_scores() {
        let who = identity(Role::SystemAdmin);
        let err = RatingFilter::parse(
            &who,
            RatingQuery {
                min: Some("0"),
                max: Some("six"),
                user_id: Some("nope"),
                ..RatingQuery::default()
            },
        )
        .unwrap_err();
        let RatingFilterError::Invalid(errors) = err else {
            panic!("expected validation errors");
        };
        assert!(errors.has("min"));
        assert!(errors.has("max"));
        assert!(errors.has("user_id"));
    }

    #[test]
    fn test_rating_filter_foreign_user_is_denied() {
        let who = identity(Role::StoreOwner);
        let other = UserId::generate().to_string();
        let err = RatingFilter::parse(
            &who,
            RatingQuery {
                user_id: Some(&other),
                ..RatingQuery::default()
            },
        )
        .unwrap_err();
        assert_eq!(err, RatingFilterError::Denied(Denial::Forbidden));
    }
}
