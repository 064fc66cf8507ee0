use async_trait::async_trait;
use aws_sdk_dynamodb as dynamodb;
use dynamodb::error::DisplayErrorContext;
use dynamodb::types::{
    AttributeDefinition, AttributeValue, BillingMode, KeySchemaElement, KeyType,
    ScalarAttributeType,
};
use serde_json::Value;
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::sync::{Arc, Mutex};

use crate::config::AppConfig;
use crate::keys::{GradeKey, PartitionKey, PeriodPrefix, SortKey};
use crate::models::StoredGrade;

// Stored item attribute names. The composite attribute names are the wire
// format of the grades table and must not change.
const GRADES_PARTITION_ATTR: &str = "tenant_id#user_id";
const GRADES_SORT_ATTR: &str = "periodo#curso_id";
const GRADE_ATTR: &str = "grade";
const REGISTERED_BY_ATTR: &str = "registered_by";

// Users table: same partition shape, with the role as the sort attribute.
// Only the student discriminator is ever read from here.
const USERS_SORT_ATTR: &str = "role";
const STUDENT_ROLE_VALUE: &str = "student";

/// StoreError
///
/// Failure surfaced by a store operation. Converted at the error boundary into
/// a 500 with a generic message; the detail lives in the log only.
#[derive(Debug)]
pub enum StoreError {
    /// The backing table rejected or failed the call.
    Backend(String),
    /// An item came back without the attributes this service always writes.
    Corrupt(String),
}

impl StoreError {
    pub fn backend(message: impl Into<String>) -> Self {
        StoreError::Backend(message.into())
    }

    pub fn corrupt(message: impl Into<String>) -> Self {
        StoreError::Corrupt(message.into())
    }
}

impl std::fmt::Display for StoreError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StoreError::Backend(msg) => write!(f, "store backend failure: {msg}"),
            StoreError::Corrupt(msg) => write!(f, "corrupt stored item: {msg}"),
        }
    }
}

impl std::error::Error for StoreError {}

// 1. GradeStore Contract

/// GradeStore
///
/// The abstract contract for the partitioned key-value store holding grade
/// records, plus the read-only enrollment existence check against the users
/// table. Handlers only ever talk to this trait, so the concrete backend
/// (DynamoDB in production, the in-memory double in tests) is swappable.
#[async_trait]
pub trait GradeStore: Send + Sync {
    /// Unconditional upsert: a write with an existing key overwrites it.
    async fn put_grade(
        &self,
        key: &GradeKey,
        grade: &Value,
        registered_by: &str,
    ) -> Result<(), StoreError>;

    /// Exact-key lookup.
    async fn get_grade(
        &self,
        partition: &PartitionKey,
        sort: &SortKey,
    ) -> Result<Option<StoredGrade>, StoreError>;

    /// Unconditional delete. No existence feedback: deleting an absent key
    /// succeeds.
    async fn delete_grade(
        &self,
        partition: &PartitionKey,
        sort: &SortKey,
    ) -> Result<(), StoreError>;

    /// Prefix query over the partition's sort keys, in the store's natural
    /// (lexicographic) sort-key order. May be empty.
    async fn grades_for_period(
        &self,
        partition: &PartitionKey,
        prefix: &PeriodPrefix,
    ) -> Result<Vec<StoredGrade>, StoreError>;

    /// Whether a student enrollment record exists for the partition.
    async fn student_exists(&self, partition: &PartitionKey) -> Result<bool, StoreError>;
}

/// StoreState
///
/// The concrete type used to share store access across the application state.
pub type StoreState = Arc<dyn GradeStore>;

// --- Grade <-> AttributeValue conversion ---

/// A grade is persisted as a native DynamoDB number or string, matching how the
/// request validated it. Other JSON types never reach the store.
fn grade_to_attr(grade: &Value) -> Result<AttributeValue, StoreError> {
    match grade {
        Value::Number(n) => Ok(AttributeValue::N(n.to_string())),
        Value::String(s) => Ok(AttributeValue::S(s.clone())),
        other => Err(StoreError::corrupt(format!(
            "grade must be a number or string, got: {other}"
        ))),
    }
}

fn attr_to_grade(attr: &AttributeValue) -> Result<Value, StoreError> {
    match attr {
        AttributeValue::N(n) => {
            let num: serde_json::Number = serde_json::from_str(n)
                .map_err(|e| StoreError::corrupt(format!("unparseable numeric grade {n:?}: {e}")))?;
            Ok(Value::Number(num))
        }
        AttributeValue::S(s) => Ok(Value::String(s.clone())),
        other => Err(StoreError::corrupt(format!(
            "unexpected grade attribute type: {other:?}"
        ))),
    }
}

fn parse_grade_item(item: &HashMap<String, AttributeValue>) -> Result<StoredGrade, StoreError> {
    let sort_key = item
        .get(GRADES_SORT_ATTR)
        .and_then(|v| v.as_s().ok())
        .ok_or_else(|| StoreError::corrupt(format!("missing {GRADES_SORT_ATTR} attribute")))?
        .clone();
    let grade = item
        .get(GRADE_ATTR)
        .ok_or_else(|| StoreError::corrupt(format!("missing {GRADE_ATTR} attribute")))
        .and_then(attr_to_grade)?;
    let registered_by = item
        .get(REGISTERED_BY_ATTR)
        .and_then(|v| v.as_s().ok())
        .ok_or_else(|| StoreError::corrupt(format!("missing {REGISTERED_BY_ATTR} attribute")))?
        .clone();
    Ok(StoredGrade {
        sort_key,
        grade,
        registered_by,
    })
}

// 2. The Real Implementation (DynamoDB)

/// DynamoGradeStore
///
/// The concrete implementation backed by DynamoDB (or dynamodb-local in the
/// Local environment). The long-lived client is built once at startup from
/// static configuration credentials and reused across all requests.
#[derive(Clone)]
pub struct DynamoGradeStore {
    client: dynamodb::Client,
    notes_table: String,
    users_table: String,
}

impl DynamoGradeStore {
    /// Constructs the DynamoDB client from AppConfig. When no explicit endpoint
    /// is configured (Production against real AWS) the regional endpoint is
    /// used.
    pub fn new(config: &AppConfig) -> Self {
        let credentials = dynamodb::config::Credentials::new(
            &config.dynamo_key,
            &config.dynamo_secret,
            None,
            None,
            "static",
        );

        let mut builder = dynamodb::Config::builder()
            .credentials_provider(credentials)
            .region(dynamodb::config::Region::new(config.dynamo_region.clone()))
            .behavior_version_latest();

        if let Some(endpoint) = &config.dynamo_endpoint {
            builder = builder.endpoint_url(endpoint);
        }

        let client = dynamodb::Client::from_conf(builder.build());

        Self {
            client,
            notes_table: config.notes_table.clone(),
            users_table: config.users_table.clone(),
        }
    }

    /// Provisions the grades and users tables against dynamodb-local. Creation
    /// is idempotent from our point of view: an AlreadyExists rejection is
    /// ignored, so this is safe to call at every startup. Never used against
    /// production infrastructure.
    pub async fn ensure_tables_exist(&self) {
        let _ = self
            .client
            .create_table()
            .table_name(&self.notes_table)
            .attribute_definitions(string_attr(GRADES_PARTITION_ATTR))
            .attribute_definitions(string_attr(GRADES_SORT_ATTR))
            .key_schema(key_element(GRADES_PARTITION_ATTR, KeyType::Hash))
            .key_schema(key_element(GRADES_SORT_ATTR, KeyType::Range))
            .billing_mode(BillingMode::PayPerRequest)
            .send()
            .await;

        let _ = self
            .client
            .create_table()
            .table_name(&self.users_table)
            .attribute_definitions(string_attr(GRADES_PARTITION_ATTR))
            .attribute_definitions(string_attr(USERS_SORT_ATTR))
            .key_schema(key_element(GRADES_PARTITION_ATTR, KeyType::Hash))
            .key_schema(key_element(USERS_SORT_ATTR, KeyType::Range))
            .billing_mode(BillingMode::PayPerRequest)
            .send()
            .await;
    }
}

fn string_attr(name: &str) -> AttributeDefinition {
    AttributeDefinition::builder()
        .attribute_name(name)
        .attribute_type(ScalarAttributeType::S)
        .build()
        .expect("attribute name and type are always set")
}

fn key_element(name: &str, key_type: KeyType) -> KeySchemaElement {
    KeySchemaElement::builder()
        .attribute_name(name)
        .key_type(key_type)
        .build()
        .expect("attribute name and key type are always set")
}

#[async_trait]
impl GradeStore for DynamoGradeStore {
    async fn put_grade(
        &self,
        key: &GradeKey,
        grade: &Value,
        registered_by: &str,
    ) -> Result<(), StoreError> {
        self.client
            .put_item()
            .table_name(&self.notes_table)
            .item(
                GRADES_PARTITION_ATTR,
                AttributeValue::S(key.partition.as_str().to_string()),
            )
            .item(
                GRADES_SORT_ATTR,
                AttributeValue::S(key.sort.as_str().to_string()),
            )
            .item(GRADE_ATTR, grade_to_attr(grade)?)
            .item(REGISTERED_BY_ATTR, AttributeValue::S(registered_by.to_string()))
            .send()
            .await
            .map_err(|e| StoreError::backend(DisplayErrorContext(e).to_string()))?;
        Ok(())
    }

    async fn get_grade(
        &self,
        partition: &PartitionKey,
        sort: &SortKey,
    ) -> Result<Option<StoredGrade>, StoreError> {
        let output = self
            .client
            .get_item()
            .table_name(&self.notes_table)
            .key(
                GRADES_PARTITION_ATTR,
                AttributeValue::S(partition.as_str().to_string()),
            )
            .key(GRADES_SORT_ATTR, AttributeValue::S(sort.as_str().to_string()))
            .send()
            .await
            .map_err(|e| StoreError::backend(DisplayErrorContext(e).to_string()))?;

        output.item.as_ref().map(parse_grade_item).transpose()
    }

    async fn delete_grade(
        &self,
        partition: &PartitionKey,
        sort: &SortKey,
    ) -> Result<(), StoreError> {
        self.client
            .delete_item()
            .table_name(&self.notes_table)
            .key(
                GRADES_PARTITION_ATTR,
                AttributeValue::S(partition.as_str().to_string()),
            )
            .key(GRADES_SORT_ATTR, AttributeValue::S(sort.as_str().to_string()))
            .send()
            .await
            .map_err(|e| StoreError::backend(DisplayErrorContext(e).to_string()))?;
        Ok(())
    }

    async fn grades_for_period(
        &self,
        partition: &PartitionKey,
        prefix: &PeriodPrefix,
    ) -> Result<Vec<StoredGrade>, StoreError> {
        // begins_with over the sort key; DynamoDB returns items in sort-key
        // order within the partition, which is exactly the order we expose.
        let output = self
            .client
            .query()
            .table_name(&self.notes_table)
            .key_condition_expression(
                "#partitionKey = :partitionKey AND begins_with(#sortKey, :periodo)",
            )
            .expression_attribute_names("#partitionKey", GRADES_PARTITION_ATTR)
            .expression_attribute_names("#sortKey", GRADES_SORT_ATTR)
            .expression_attribute_values(
                ":partitionKey",
                AttributeValue::S(partition.as_str().to_string()),
            )
            .expression_attribute_values(":periodo", AttributeValue::S(prefix.as_str().to_string()))
            .send()
            .await
            .map_err(|e| StoreError::backend(DisplayErrorContext(e).to_string()))?;

        output
            .items
            .unwrap_or_default()
            .iter()
            .map(parse_grade_item)
            .collect()
    }

    async fn student_exists(&self, partition: &PartitionKey) -> Result<bool, StoreError> {
        let output = self
            .client
            .get_item()
            .table_name(&self.users_table)
            .key(
                GRADES_PARTITION_ATTR,
                AttributeValue::S(partition.as_str().to_string()),
            )
            .key(
                USERS_SORT_ATTR,
                AttributeValue::S(STUDENT_ROLE_VALUE.to_string()),
            )
            .send()
            .await
            .map_err(|e| StoreError::backend(DisplayErrorContext(e).to_string()))?;

        Ok(output.item.is_some())
    }
}

// 3. The In-Memory Implementation (For Tests and Local Experimentation)

/// MemoryGradeStore
///
/// A deterministic `GradeStore` double backed by a BTreeMap, so prefix queries
/// come back in the same lexicographic sort-key order DynamoDB would use.
/// Tests seed enrollments through `enroll_student` and can flip the store into
/// a failing mode to exercise the 500 path.
#[derive(Default)]
pub struct MemoryGradeStore {
    grades: Mutex<BTreeMap<(String, String), (Value, String)>>,
    students: Mutex<BTreeSet<String>>,
    should_fail: bool,
}

impl MemoryGradeStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every operation on the returned store fails with a backend error.
    pub fn new_failing() -> Self {
        Self {
            should_fail: true,
            ..Self::default()
        }
    }

    /// Seeds a student enrollment record for the given partition.
    pub fn enroll_student(&self, partition: &PartitionKey) {
        self.students
            .lock()
            .unwrap()
            .insert(partition.as_str().to_string());
    }

    fn check_failure(&self) -> Result<(), StoreError> {
        if self.should_fail {
            return Err(StoreError::backend("simulated failure requested"));
        }
        Ok(())
    }
}

#[async_trait]
impl GradeStore for MemoryGradeStore {
    async fn put_grade(
        &self,
        key: &GradeKey,
        grade: &Value,
        registered_by: &str,
    ) -> Result<(), StoreError> {
        self.check_failure()?;
        self.grades.lock().unwrap().insert(
            (
                key.partition.as_str().to_string(),
                key.sort.as_str().to_string(),
            ),
            (grade.clone(), registered_by.to_string()),
        );
        Ok(())
    }

    async fn get_grade(
        &self,
        partition: &PartitionKey,
        sort: &SortKey,
    ) -> Result<Option<StoredGrade>, StoreError> {
        self.check_failure()?;
        let grades = self.grades.lock().unwrap();
        Ok(grades
            .get(&(partition.as_str().to_string(), sort.as_str().to_string()))
            .map(|(grade, registered_by)| StoredGrade {
                sort_key: sort.as_str().to_string(),
                grade: grade.clone(),
                registered_by: registered_by.clone(),
            }))
    }

    async fn delete_grade(
        &self,
        partition: &PartitionKey,
        sort: &SortKey,
    ) -> Result<(), StoreError> {
        self.check_failure()?;
        // Removing an absent key is not an error: delete is idempotent.
        self.grades
            .lock()
            .unwrap()
            .remove(&(partition.as_str().to_string(), sort.as_str().to_string()));
        Ok(())
    }

    async fn grades_for_period(
        &self,
        partition: &PartitionKey,
        prefix: &PeriodPrefix,
    ) -> Result<Vec<StoredGrade>, StoreError> {
        self.check_failure()?;
        let grades = self.grades.lock().unwrap();
        // BTreeMap iteration order keeps the lexicographic sort-key order.
        Ok(grades
            .iter()
            .filter(|((p, s), _)| p.as_str() == partition.as_str() && s.starts_with(prefix.as_str()))
            .map(|((_, s), (grade, registered_by))| StoredGrade {
                sort_key: s.clone(),
                grade: grade.clone(),
                registered_by: registered_by.clone(),
            })
            .collect())
    }

    async fn student_exists(&self, partition: &PartitionKey) -> Result<bool, StoreError> {
        self.check_failure()?;
        Ok(self.students.lock().unwrap().contains(partition.as_str()))
    }
}
