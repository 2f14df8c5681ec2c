//! Canonical fields, the synonym dictionary, and schema groupings.
//!
//! This module owns the closed [`CanonicalField`] enumeration (the semantic
//! column identities used by the renderers), the deterministic synonym table
//! consulted by the header detector and the heuristic mapper, the alias
//! table used to coerce AI answers onto canonical names, and the per-schema
//! core-field sets driving the quality evaluator.
//!
//! The synonym dictionary covers both English and Japanese spec-sheet
//! vocabulary; keys are stored pre-normalized (see [`normalize_header`]).

use std::collections::HashMap;
use std::fmt;
use std::sync::OnceLock;

use serde::Serialize;

/// Normalization applied to headers before any dictionary lookup:
/// lowercase, trim, collapse internal whitespace runs to a single space.
pub fn normalize_header(name: &str) -> String {
    name.trim()
        .to_lowercase()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CanonicalField {
    // Test-case schema
    Id,
    Feature,
    Scenario,
    Instructions,
    Inputs,
    Expected,
    Precondition,
    Priority,
    Type,
    Status,
    // UI-spec schema
    No,
    ItemName,
    ItemType,
    RequiredOptional,
    InputRestrictions,
    DisplayConditions,
    Action,
    NavigationDestination,
    // Product-backlog schema
    Title,
    Description,
    AcceptanceCriteria,
    // API-spec schema
    Endpoint,
    Method,
    Parameters,
    Response,
    StatusCode,
    // Cross-cutting
    Component,
    Assignee,
    Category,
    Notes,
}

impl CanonicalField {
    pub const ALL: [CanonicalField; 30] = [
        CanonicalField::Id,
        CanonicalField::Feature,
        CanonicalField::Scenario,
        CanonicalField::Instructions,
        CanonicalField::Inputs,
        CanonicalField::Expected,
        CanonicalField::Precondition,
        CanonicalField::Priority,
        CanonicalField::Type,
        CanonicalField::Status,
        CanonicalField::No,
        CanonicalField::ItemName,
        CanonicalField::ItemType,
        CanonicalField::RequiredOptional,
        CanonicalField::InputRestrictions,
        CanonicalField::DisplayConditions,
        CanonicalField::Action,
        CanonicalField::NavigationDestination,
        CanonicalField::Title,
        CanonicalField::Description,
        CanonicalField::AcceptanceCriteria,
        CanonicalField::Endpoint,
        CanonicalField::Method,
        CanonicalField::Parameters,
        CanonicalField::Response,
        CanonicalField::StatusCode,
        CanonicalField::Component,
        CanonicalField::Assignee,
        CanonicalField::Category,
        CanonicalField::Notes,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            CanonicalField::Id => "id",
            CanonicalField::Feature => "feature",
            CanonicalField::Scenario => "scenario",
            CanonicalField::Instructions => "instructions",
            CanonicalField::Inputs => "inputs",
            CanonicalField::Expected => "expected",
            CanonicalField::Precondition => "precondition",
            CanonicalField::Priority => "priority",
            CanonicalField::Type => "type",
            CanonicalField::Status => "status",
            CanonicalField::No => "no",
            CanonicalField::ItemName => "item_name",
            CanonicalField::ItemType => "item_type",
            CanonicalField::RequiredOptional => "required_optional",
            CanonicalField::InputRestrictions => "input_restrictions",
            CanonicalField::DisplayConditions => "display_conditions",
            CanonicalField::Action => "action",
            CanonicalField::NavigationDestination => "navigation_destination",
            CanonicalField::Title => "title",
            CanonicalField::Description => "description",
            CanonicalField::AcceptanceCriteria => "acceptance_criteria",
            CanonicalField::Endpoint => "endpoint",
            CanonicalField::Method => "method",
            CanonicalField::Parameters => "parameters",
            CanonicalField::Response => "response",
            CanonicalField::StatusCode => "status_code",
            CanonicalField::Component => "component",
            CanonicalField::Assignee => "assignee",
            CanonicalField::Category => "category",
            CanonicalField::Notes => "notes",
        }
    }

    /// Human-readable label used by the spec renderer.
    pub fn label(self) -> &'static str {
        match self {
            CanonicalField::Id => "ID",
            CanonicalField::Feature => "Feature",
            CanonicalField::Scenario => "Scenario",
            CanonicalField::Instructions => "Steps",
            CanonicalField::Inputs => "Test Data",
            CanonicalField::Expected => "Expected Result",
            CanonicalField::Precondition => "Precondition",
            CanonicalField::Priority => "Priority",
            CanonicalField::Type => "Type",
            CanonicalField::Status => "Status",
            CanonicalField::No => "No",
            CanonicalField::ItemName => "Item Name",
            CanonicalField::ItemType => "Item Type",
            CanonicalField::RequiredOptional => "Required/Optional",
            CanonicalField::InputRestrictions => "Input Restrictions",
            CanonicalField::DisplayConditions => "Display Conditions",
            CanonicalField::Action => "Action",
            CanonicalField::NavigationDestination => "Navigation Destination",
            CanonicalField::Title => "Title",
            CanonicalField::Description => "Description",
            CanonicalField::AcceptanceCriteria => "Acceptance Criteria",
            CanonicalField::Endpoint => "Endpoint",
            CanonicalField::Method => "Method",
            CanonicalField::Parameters => "Parameters",
            CanonicalField::Response => "Response",
            CanonicalField::StatusCode => "Status Code",
            CanonicalField::Component => "Component",
            CanonicalField::Assignee => "Assignee",
            CanonicalField::Category => "Category",
            CanonicalField::Notes => "Notes",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        let normalized = name.trim().to_lowercase();
        CanonicalField::ALL
            .into_iter()
            .find(|field| field.as_str() == normalized)
    }

    /// Header keyword fragments used by dynamic inference. A normalized
    /// header containing any fragment counts as a keyword match.
    pub fn keywords(self) -> &'static [&'static str] {
        match self {
            CanonicalField::Id => &["id", "識別"],
            CanonicalField::Feature => &["feature", "function", "機能"],
            CanonicalField::Scenario => &["scenario", "シナリオ"],
            CanonicalField::Instructions => &["step", "procedure", "instruction", "手順"],
            CanonicalField::Inputs => &["input", "data", "入力値", "データ"],
            CanonicalField::Expected => &["expect", "期待"],
            CanonicalField::Precondition => &["precondition", "prerequisite", "前提", "事前"],
            CanonicalField::Priority => &["priority", "severity", "優先", "重要度"],
            CanonicalField::Type => &["type", "kind", "種別", "種類"],
            CanonicalField::Status => &["status", "state", "状態", "ステータス"],
            CanonicalField::No => &["no.", "number", "番号"],
            CanonicalField::ItemName => &["item", "field", "項目"],
            CanonicalField::ItemType => &["item type", "control", "部品"],
            CanonicalField::RequiredOptional => &["required", "optional", "必須", "任意"],
            CanonicalField::InputRestrictions => &["restriction", "validation", "制限"],
            CanonicalField::DisplayConditions => &["display", "condition", "表示"],
            CanonicalField::Action => &["action", "operation", "操作", "アクション"],
            CanonicalField::NavigationDestination => &["navigation", "destination", "遷移"],
            CanonicalField::Title => &["title", "summary", "subject", "タイトル", "件名"],
            CanonicalField::Description => &["description", "overview", "detail", "概要", "説明"],
            CanonicalField::AcceptanceCriteria => &["acceptance", "criteria", "受入"],
            CanonicalField::Endpoint => &["endpoint", "url", "path", "uri"],
            CanonicalField::Method => &["method", "メソッド"],
            CanonicalField::Parameters => &["parameter", "param", "パラメータ"],
            CanonicalField::Response => &["response", "レスポンス", "応答"],
            CanonicalField::StatusCode => &["status code", "http status", "コード"],
            CanonicalField::Component => &["component", "module", "コンポーネント"],
            CanonicalField::Assignee => &["assignee", "owner", "担当"],
            CanonicalField::Category => &["category", "group", "分類", "カテゴリ"],
            CanonicalField::Notes => &["note", "remark", "memo", "comment", "備考", "メモ"],
        }
    }
}

impl fmt::Display for CanonicalField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Looks up a normalized header in the synonym dictionary.
pub fn lookup_synonym(normalized: &str) -> Option<CanonicalField> {
    synonym_table().get(normalized).copied()
}

pub fn is_synonym(normalized: &str) -> bool {
    synonym_table().contains_key(normalized)
}

/// Resolves an AI-reported field name: canonical names first, then the alias
/// table. Returns `None` for names outside the contract.
pub fn resolve_field_name(name: &str) -> Option<CanonicalField> {
    let normalized = name.trim().to_lowercase().replace([' ', '-'], "_");
    CanonicalField::from_name(&normalized).or_else(|| alias_table().get(normalized.as_str()).copied())
}

fn synonym_table() -> &'static HashMap<&'static str, CanonicalField> {
    static TABLE: OnceLock<HashMap<&'static str, CanonicalField>> = OnceLock::new();
    TABLE.get_or_init(|| {
        use CanonicalField::*;
        let mut table = HashMap::new();
        for (key, field) in [
            // Test-case schema
            ("id", Id),
            ("test id", Id),
            ("testcase id", Id),
            ("test case id", Id),
            ("case id", Id),
            ("feature", Feature),
            ("function", Feature),
            ("feature name", Feature),
            ("機能", Feature),
            ("機能名", Feature),
            ("scenario", Scenario),
            ("test scenario", Scenario),
            ("case", Scenario),
            ("test case", Scenario),
            ("シナリオ", Scenario),
            ("テストケース", Scenario),
            ("instructions", Instructions),
            ("steps", Instructions),
            ("test steps", Instructions),
            ("procedure", Instructions),
            ("how to test", Instructions),
            ("手順", Instructions),
            ("テスト手順", Instructions),
            ("操作手順", Instructions),
            ("inputs", Inputs),
            ("input", Inputs),
            ("test data", Inputs),
            ("入力値", Inputs),
            ("テストデータ", Inputs),
            ("expected", Expected),
            ("expected result", Expected),
            ("expected results", Expected),
            ("expected behavior", Expected),
            ("expected behaviour", Expected),
            ("result", Expected),
            ("期待値", Expected),
            ("期待結果", Expected),
            ("precondition", Precondition),
            ("preconditions", Precondition),
            ("prerequisite", Precondition),
            ("prerequisites", Precondition),
            ("前提条件", Precondition),
            ("事前条件", Precondition),
            ("priority", Priority),
            ("severity", Priority),
            ("優先度", Priority),
            ("重要度", Priority),
            ("type", Type),
            ("test type", Type),
            ("種別", Type),
            ("種類", Type),
            ("status", Status),
            ("state", Status),
            ("状態", Status),
            ("ステータス", Status),
            ("進捗", Status),
            // UI-spec schema
            ("no", No),
            ("no.", No),
            ("number", No),
            ("番号", No),
            ("item name", ItemName),
            ("item", ItemName),
            ("field name", ItemName),
            ("screen item", ItemName),
            ("項目名", ItemName),
            ("画面項目", ItemName),
            ("item type", ItemType),
            ("field type", ItemType),
            ("control type", ItemType),
            ("項目種別", ItemType),
            ("部品種別", ItemType),
            ("required/optional", RequiredOptional),
            ("required", RequiredOptional),
            ("必須/任意", RequiredOptional),
            ("必須任意", RequiredOptional),
            ("input restrictions", InputRestrictions),
            ("restrictions", InputRestrictions),
            ("validation", InputRestrictions),
            ("入力制限", InputRestrictions),
            ("display conditions", DisplayConditions),
            ("display condition", DisplayConditions),
            ("表示条件", DisplayConditions),
            ("action", Action),
            ("operation", Action),
            ("動作", Action),
            ("アクション", Action),
            ("navigation destination", NavigationDestination),
            ("navigation", NavigationDestination),
            ("destination", NavigationDestination),
            ("遷移先", NavigationDestination),
            ("画面遷移", NavigationDestination),
            // Product-backlog schema
            ("title", Title),
            ("summary", Title),
            ("subject", Title),
            ("タイトル", Title),
            ("件名", Title),
            ("description", Description),
            ("overview", Description),
            ("details", Description),
            ("概要", Description),
            ("説明", Description),
            ("詳細", Description),
            ("acceptance criteria", AcceptanceCriteria),
            ("acceptance", AcceptanceCriteria),
            ("受入基準", AcceptanceCriteria),
            // API-spec schema
            ("endpoint", Endpoint),
            ("url", Endpoint),
            ("path", Endpoint),
            ("エンドポイント", Endpoint),
            ("method", Method),
            ("http method", Method),
            ("メソッド", Method),
            ("parameters", Parameters),
            ("params", Parameters),
            ("request parameters", Parameters),
            ("パラメータ", Parameters),
            ("response", Response),
            ("response body", Response),
            ("レスポンス", Response),
            ("status code", StatusCode),
            ("http status", StatusCode),
            ("ステータスコード", StatusCode),
            // Cross-cutting
            ("component", Component),
            ("module", Component),
            ("コンポーネント", Component),
            ("assignee", Assignee),
            ("owner", Assignee),
            ("person in charge", Assignee),
            ("担当", Assignee),
            ("担当者", Assignee),
            ("category", Category),
            ("group", Category),
            ("分類", Category),
            ("カテゴリ", Category),
            ("notes", Notes),
            ("note", Notes),
            ("remarks", Notes),
            ("remark", Notes),
            ("memo", Notes),
            ("comment", Notes),
            ("comments", Notes),
            ("備考", Notes),
            ("メモ", Notes),
            ("注記", Notes),
        ] {
            table.insert(key, field);
        }
        table
    })
}

fn alias_table() -> &'static HashMap<&'static str, CanonicalField> {
    static TABLE: OnceLock<HashMap<&'static str, CanonicalField>> = OnceLock::new();
    TABLE.get_or_init(|| {
        use CanonicalField::*;
        [
            ("test_id", Id),
            ("case_id", Id),
            ("identifier", Id),
            ("test_case", Scenario),
            ("case_name", Scenario),
            ("summary", Title),
            ("name", Title),
            ("expected_result", Expected),
            ("expected_results", Expected),
            ("expected_behavior", Expected),
            ("steps", Instructions),
            ("test_steps", Instructions),
            ("procedure", Instructions),
            ("test_data", Inputs),
            ("input", Inputs),
            ("prerequisite", Precondition),
            ("preconditions", Precondition),
            ("severity", Priority),
            ("test_type", Type),
            ("state", Status),
            ("screen_item", ItemName),
            ("field_name", ItemName),
            ("control_type", ItemType),
            ("required", RequiredOptional),
            ("validation", InputRestrictions),
            ("display_condition", DisplayConditions),
            ("operation", Action),
            ("destination", NavigationDestination),
            ("transition", NavigationDestination),
            ("overview", Description),
            ("detail", Description),
            ("details", Description),
            ("acceptance", AcceptanceCriteria),
            ("url", Endpoint),
            ("path", Endpoint),
            ("api_path", Endpoint),
            ("http_method", Method),
            ("params", Parameters),
            ("request_parameters", Parameters),
            ("response_body", Response),
            ("http_status", StatusCode),
            ("http_status_code", StatusCode),
            ("module", Component),
            ("owner", Assignee),
            ("group", Category),
            ("remarks", Notes),
            ("remark", Notes),
            ("memo", Notes),
            ("comment", Notes),
        ]
        .into_iter()
        .collect()
    })
}

/// The overlapping schemas a sheet may belong to. `core_fields` drives the
/// core-coverage term of the quality score; `max` over schemas is used so a
/// sheet only needs to fit one of them well.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SchemaKind {
    TestCase,
    UiSpec,
    Backlog,
    ApiSpec,
    Issue,
}

impl SchemaKind {
    pub const ALL: [SchemaKind; 5] = [
        SchemaKind::TestCase,
        SchemaKind::UiSpec,
        SchemaKind::Backlog,
        SchemaKind::ApiSpec,
        SchemaKind::Issue,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            SchemaKind::TestCase => "test_case",
            SchemaKind::UiSpec => "ui_spec",
            SchemaKind::Backlog => "backlog",
            SchemaKind::ApiSpec => "api_spec",
            SchemaKind::Issue => "issue",
        }
    }

    pub fn core_fields(self) -> &'static [CanonicalField] {
        use CanonicalField::*;
        match self {
            SchemaKind::TestCase => &[Id, Feature, Scenario, Instructions, Expected],
            SchemaKind::UiSpec => &[No, ItemName, ItemType],
            SchemaKind::Backlog => &[Id, Title, Description, AcceptanceCriteria],
            SchemaKind::ApiSpec => &[Endpoint, Method, Response],
            SchemaKind::Issue => &[Id, Title, Status, Assignee],
        }
    }
}

impl fmt::Display for SchemaKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
