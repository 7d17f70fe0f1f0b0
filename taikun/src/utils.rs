//! Conversion helpers and the read-after-write / poll-until machinery
//! shared by every resource.

use std::collections::HashSet;
use std::future::Future;
use std::hash::Hash;
use std::time::Duration;

use chrono::NaiveDate;
use tfplug::context::Context;
use tfplug::schema::{Attribute, NestedType, Schema};
use tfplug::types::DynamicValue;

use crate::api::ApiError;

pub const GIB: i64 = 1 << 30;

/// Deadline for the read loop after a create.
pub const READ_AFTER_CREATE_TIMEOUT: Duration = Duration::from_secs(2 * 60);
/// Deadline for the read loop after an update.
pub const READ_AFTER_UPDATE_TIMEOUT: Duration = Duration::from_secs(60);
/// Projects deploy slowly; their post-write reads get 80 minutes.
pub const PROJECT_TIMEOUT: Duration = Duration::from_secs(80 * 60);
/// Deadline for service-toggle and repository-indexing waits.
pub const TOGGLE_TIMEOUT: Duration = Duration::from_secs(5 * 60);
/// Deadline for application-instance state transitions.
pub const INSTANCE_TIMEOUT: Duration = Duration::from_secs(10 * 60);

pub const RETRY_INTERVAL: Duration = Duration::from_secs(5);
pub const INSTANCE_POLL_INTERVAL: Duration = Duration::from_secs(10);

/// 32-bit-safe id parse; failure is a validation error naming the input.
pub fn atoi32(value: &str) -> Result<i32, ApiError> {
    value
        .parse::<i32>()
        .map_err(|_| ApiError::Validation(format!("expected a 32-bit integer, got {:?}", value)))
}

pub fn i32toa(value: i32) -> String {
    value.to_string()
}

pub fn gib_to_bytes(gib: i64) -> i64 {
    gib * GIB
}

/// Floor-divides: the server occasionally reports byte counts that are
/// not a multiple of 2^30.
pub fn bytes_to_gib(bytes: i64) -> i64 {
    bytes / GIB
}

/// ±0.01% widening applied to min/max CPU/RAM filter bounds so exact
/// GiB values survive the server's float rounding.
pub fn tolerance_bounds(min: Option<f64>, max: Option<f64>) -> (Option<f64>, Option<f64>) {
    (min.map(|v| v * (1.0 - 1e-4)), max.map(|v| v * (1.0 + 1e-4)))
}

/// `dd/mm/yyyy` → `yyyy-mm-ddT00:00:00Z`; empty string means "no
/// expiration" and maps to `None`.
pub fn parse_expiration_date(value: &str) -> Result<Option<String>, ApiError> {
    if value.is_empty() {
        return Ok(None);
    }
    let date = NaiveDate::parse_from_str(value, "%d/%m/%Y").map_err(|_| {
        ApiError::Validation(format!("expected a dd/mm/yyyy date, got {:?}", value))
    })?;
    Ok(Some(format!("{}T00:00:00Z", date.format("%Y-%m-%d"))))
}

/// Inverse of [`parse_expiration_date`]; tolerant of any RFC3339 suffix.
pub fn format_expiration_date(value: Option<&str>) -> String {
    let Some(value) = value else {
        return String::new();
    };
    if value.len() < 10 {
        return String::new();
    }
    match NaiveDate::parse_from_str(&value[..10], "%Y-%m-%d") {
        Ok(date) => date.format("%d/%m/%Y").to_string(),
        Err(_) => String::new(),
    }
}

/// Elements of `new` absent from `old`, and of `old` absent from `new`.
pub fn set_diff<T: Eq + Hash + Clone>(old: &[T], new: &[T]) -> (Vec<T>, Vec<T>) {
    let old_set: HashSet<&T> = old.iter().collect();
    let new_set: HashSet<&T> = new.iter().collect();
    let added = new
        .iter()
        .filter(|item| !old_set.contains(item))
        .cloned()
        .collect();
    let removed = old
        .iter()
        .filter(|item| !new_set.contains(item))
        .cloned()
        .collect();
    (added, removed)
}

/// Post-write read loop. The Taikun list endpoints are eventually
/// consistent, so a read issued right after a write may see zero rows;
/// only that sentinel is retried, every other error is terminal. The
/// deadline exhausting surfaces a timeout naming the entity.
pub async fn read_after_write<F, Fut>(
    ctx: &Context,
    entity: &str,
    deadline: Duration,
    read: F,
) -> Result<Option<DynamicValue>, ApiError>
where
    F: Fn() -> Fut,
    Fut: Future<Output = Result<Option<DynamicValue>, ApiError>>,
{
    let started = tokio::time::Instant::now();
    loop {
        match read().await {
            Err(e) if e.is_retryable_read() => {}
            other => return other,
        }
        if ctx.is_cancelled() || started.elapsed() + RETRY_INTERVAL > deadline {
            return Err(ApiError::timeout(entity, "visible after write"));
        }
        tracing::debug!("{} not yet visible, retrying", entity);
        tokio::time::sleep(RETRY_INTERVAL).await;
    }
}

/// Polls `check` until it reports true, the context is cancelled or the
/// deadline exhausts. Used for all wait-for-Ready loops.
pub async fn poll_until<F, Fut>(
    ctx: &Context,
    entity: &str,
    target: &str,
    deadline: Duration,
    interval: Duration,
    check: F,
) -> Result<(), ApiError>
where
    F: Fn() -> Fut,
    Fut: Future<Output = Result<bool, ApiError>>,
{
    let started = tokio::time::Instant::now();
    loop {
        if check().await? {
            return Ok(());
        }
        if ctx.is_cancelled() || started.elapsed() + interval > deadline {
            return Err(ApiError::timeout(entity, target));
        }
        tracing::debug!("waiting for {} to reach {}", entity, target);
        tokio::time::sleep(interval).await;
    }
}

/// Rebuilds a resource schema as a data-source schema: every attribute
/// computed-only, validators and modifiers stripped, nested blocks
/// recursed. Callers re-mark their lookup keys with [`mark_required`].
pub fn datasource_schema_from_resource_schema(schema: &Schema) -> Schema {
    Schema {
        version: schema.version,
        description: schema.description.clone(),
        attributes: schema
            .attributes
            .iter()
            .map(computed_only_attribute)
            .collect(),
    }
}

fn computed_only_attribute(attribute: &Attribute) -> Attribute {
    Attribute {
        name: attribute.name.clone(),
        r#type: attribute.r#type.clone(),
        description: attribute.description.clone(),
        required: false,
        optional: false,
        computed: true,
        sensitive: attribute.sensitive,
        force_new: false,
        validators: Vec::new(),
        plan_modifiers: Vec::new(),
        nested: attribute.nested.as_ref().map(|nested| NestedType {
            nesting: nested.nesting,
            attributes: nested.attributes.iter().map(computed_only_attribute).collect(),
        }),
    }
}

/// Turns one attribute of a derived data-source schema back into a
/// required lookup key.
pub fn mark_required(mut schema: Schema, name: &str) -> Schema {
    for attribute in &mut schema.attributes {
        if attribute.name == name {
            attribute.required = true;
            attribute.computed = false;
        }
    }
    schema
}

/// Same, but optional: a secondary lookup key.
pub fn mark_optional(mut schema: Schema, name: &str) -> Schema {
    for attribute in &mut schema.attributes {
        if attribute.name == name {
            attribute.optional = true;
            attribute.computed = false;
        }
    }
    schema
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};
    use tfplug::schema::{AttributeBuilder, AttributeType, SchemaBuilder};
    use tfplug::validator::StringLengthValidator;
    use std::sync::Arc;

    #[test]
    fn atoi32_rejects_garbage() {
        assert_eq!(atoi32("42").unwrap(), 42);
        assert!(matches!(atoi32("4.2"), Err(ApiError::Validation(_))));
        assert!(matches!(atoi32(""), Err(ApiError::Validation(_))));
    }

    #[test]
    fn gib_conversion_floors() {
        assert_eq!(gib_to_bytes(30), 30 * (1 << 30));
        assert_eq!(bytes_to_gib(30 * (1 << 30)), 30);
        assert_eq!(bytes_to_gib(30 * (1 << 30) + 1024), 30);
    }

    #[test]
    fn expiration_date_round_trip() {
        let wire = parse_expiration_date("21/12/2027").unwrap();
        assert_eq!(wire.as_deref(), Some("2027-12-21T00:00:00Z"));
        assert_eq!(format_expiration_date(wire.as_deref()), "21/12/2027");

        assert_eq!(parse_expiration_date("").unwrap(), None);
        assert_eq!(format_expiration_date(None), "");
        assert!(parse_expiration_date("2027-12-21").is_err());
    }

    #[test]
    fn set_diff_partitions() {
        let old = vec!["a", "b", "c"];
        let new = vec!["b", "c", "d"];
        let (added, removed) = set_diff(&old, &new);
        assert_eq!(added, vec!["d"]);
        assert_eq!(removed, vec!["a"]);
    }

    #[tokio::test(start_paused = true)]
    async fn read_after_write_retries_only_the_sentinel() {
        let ctx = Context::new();
        let attempts = AtomicU32::new(0);
        let result = read_after_write(&ctx, "access profile", Duration::from_secs(120), || {
            let n = attempts.fetch_add(1, Ordering::SeqCst);
            async move {
                if n < 3 {
                    Err(ApiError::NotFoundAfterCreateOrUpdate)
                } else {
                    Ok(Some(DynamicValue::empty_map()))
                }
            }
        })
        .await;
        assert!(result.unwrap().is_some());
        assert_eq!(attempts.load(Ordering::SeqCst), 4);
    }

    #[tokio::test(start_paused = true)]
    async fn read_after_write_deadline_becomes_timeout() {
        let ctx = Context::new();
        let result = read_after_write(&ctx, "project", Duration::from_secs(10), || async {
            Err::<Option<DynamicValue>, _>(ApiError::NotFoundAfterCreateOrUpdate)
        })
        .await;
        assert!(matches!(result, Err(ApiError::Timeout { .. })));
    }

    #[tokio::test(start_paused = true)]
    async fn read_after_write_surfaces_permanent_errors() {
        let ctx = Context::new();
        let result = read_after_write(&ctx, "project", Duration::from_secs(120), || async {
            Err::<Option<DynamicValue>, _>(ApiError::Api {
                status: 500,
                message: "boom".to_string(),
            })
        })
        .await;
        assert!(matches!(result, Err(ApiError::Api { status: 500, .. })));
    }

    #[tokio::test(start_paused = true)]
    async fn poll_until_reaches_target() {
        let ctx = Context::new();
        let attempts = AtomicU32::new(0);
        poll_until(
            &ctx,
            "project 7",
            "Ready",
            Duration::from_secs(600),
            Duration::from_secs(5),
            || {
                let n = attempts.fetch_add(1, Ordering::SeqCst);
                async move { Ok(n >= 2) }
            },
        )
        .await
        .unwrap();
        assert_eq!(attempts.load(Ordering::SeqCst), 3);
    }

    #[test]
    fn datasource_schema_is_computed_only() {
        let schema = SchemaBuilder::new()
            .attribute(
                AttributeBuilder::new("name", AttributeType::String)
                    .required()
                    .validator(Arc::new(StringLengthValidator {
                        min: Some(3),
                        max: Some(30),
                    }))
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("lock", AttributeType::Bool)
                    .optional()
                    .build(),
            )
            .build();

        let derived = datasource_schema_from_resource_schema(&schema);
        for attribute in &derived.attributes {
            assert!(attribute.computed);
            assert!(!attribute.required);
            assert!(!attribute.optional);
            assert!(attribute.validators.is_empty());
        }

        let derived = mark_required(derived, "name");
        let name = derived.attribute("name").unwrap();
        assert!(name.required);
        assert!(!name.computed);
    }
}
