//! WHOOP data tools.
//!
//! One tool per REST endpoint. Each tool validates its arguments, calls the
//! client and returns the response as pretty-printed JSON.

use async_trait::async_trait;
use serde::Serialize;
use serde_json::{Value, json};
use whoop_client::{CollectionQuery, WhoopClient};

use crate::error::Result;
use crate::protocol::CallToolResult;
use crate::tool::{Tool, ToolArgs, ToolContext, ToolRegistry};

/// Page size used when a collection tool is called without `limit`.
pub const DEFAULT_LIMIT: i64 = 10;

/// The WHOOP endpoints exposed as tools.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Endpoint {
    UserProfile,
    BodyMeasurements,
    Cycles,
    CycleById,
    Sleeps,
    SleepById,
    SleepForCycle,
    Recoveries,
    RecoveryForCycle,
    Workouts,
    WorkoutById,
    ActivityMapping,
}

impl Endpoint {
    pub const ALL: [Endpoint; 12] = [
        Endpoint::UserProfile,
        Endpoint::BodyMeasurements,
        Endpoint::Cycles,
        Endpoint::CycleById,
        Endpoint::Sleeps,
        Endpoint::SleepById,
        Endpoint::SleepForCycle,
        Endpoint::Recoveries,
        Endpoint::RecoveryForCycle,
        Endpoint::Workouts,
        Endpoint::WorkoutById,
        Endpoint::ActivityMapping,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Endpoint::UserProfile => "get_user_profile",
            Endpoint::BodyMeasurements => "get_body_measurements",
            Endpoint::Cycles => "get_cycles",
            Endpoint::CycleById => "get_cycle_by_id",
            Endpoint::Sleeps => "get_sleeps",
            Endpoint::SleepById => "get_sleep_by_id",
            Endpoint::SleepForCycle => "get_sleep_for_cycle",
            Endpoint::Recoveries => "get_recoveries",
            Endpoint::RecoveryForCycle => "get_recovery_for_cycle",
            Endpoint::Workouts => "get_workouts",
            Endpoint::WorkoutById => "get_workout_by_id",
            Endpoint::ActivityMapping => "get_activity_mapping",
        }
    }

    pub fn description(self) -> &'static str {
        match self {
            Endpoint::UserProfile => {
                "Get the authenticated user's basic profile: user ID, email, first and last \
                 name. Requires scope: read:profile"
            }
            Endpoint::BodyMeasurements => {
                "Get the user's body measurements: height (meters), weight (kilograms) and \
                 maximum heart rate. Requires scope: read:body_measurement"
            }
            Endpoint::Cycles => {
                "Get the user's physiological cycles. Each cycle is one day of strain data \
                 with start/end times, strain score and heart rate. Paginated. \
                 Requires scope: read:cycles"
            }
            Endpoint::CycleById => {
                "Get one physiological cycle by its numeric ID, including strain, heart \
                 rate and timestamps. Requires scope: read:cycles"
            }
            Endpoint::Sleeps => {
                "Get the user's sleep records with stage durations (light, deep, REM), \
                 efficiency, disturbances and respiratory rate. Paginated. \
                 Requires scope: read:sleep"
            }
            Endpoint::SleepById => {
                "Get one sleep record by UUID with all stages, efficiency and performance \
                 metrics. Requires scope: read:sleep"
            }
            Endpoint::SleepForCycle => {
                "Get the sleep record belonging to a physiological cycle. \
                 Requires scopes: read:sleep, read:cycles"
            }
            Endpoint::Recoveries => {
                "Get the user's recovery records: recovery score (0-100%), HRV in ms, \
                 resting heart rate, SpO2 and skin temperature. Paginated. \
                 Requires scope: read:recovery"
            }
            Endpoint::RecoveryForCycle => {
                "Get the recovery record belonging to a physiological cycle. \
                 Requires scopes: read:recovery, read:cycles"
            }
            Endpoint::Workouts => {
                "Get the user's workouts: sport, strain, average/max heart rate, energy, \
                 duration and heart rate zone distribution. Paginated. \
                 Requires scope: read:workout"
            }
            Endpoint::WorkoutById => {
                "Get one workout by UUID including all heart rate zones and metrics. \
                 Requires scope: read:workout"
            }
            Endpoint::ActivityMapping => {
                "Convert a legacy V1 activity ID to its V2 UUID."
            }
        }
    }

    pub fn parameters(self) -> Value {
        match self {
            Endpoint::UserProfile | Endpoint::BodyMeasurements => empty_schema(),
            Endpoint::Cycles
            | Endpoint::Sleeps
            | Endpoint::Recoveries
            | Endpoint::Workouts => collection_schema(),
            Endpoint::CycleById => id_schema(
                "cycle_id",
                "integer",
                "Numeric cycle ID (e.g. 1325792966), as returned by get_cycles.",
            ),
            Endpoint::SleepForCycle => id_schema(
                "cycle_id",
                "integer",
                "Numeric cycle ID to get sleep data for.",
            ),
            Endpoint::RecoveryForCycle => id_schema(
                "cycle_id",
                "integer",
                "Numeric cycle ID to get recovery data for.",
            ),
            Endpoint::SleepById => id_schema(
                "sleep_id",
                "string",
                "Sleep UUID (e.g. 89329a72-94e7-486c-a072-342501371575), as returned by get_sleeps.",
            ),
            Endpoint::WorkoutById => id_schema(
                "workout_id",
                "string",
                "Workout UUID (e.g. 89329a72-94e7-486c-a072-342501371575), as returned by get_workouts.",
            ),
            Endpoint::ActivityMapping => id_schema(
                "activity_v1_id",
                "integer",
                "Legacy numeric V1 activity ID.",
            ),
        }
    }
}

fn empty_schema() -> Value {
    json!({ "type": "object", "properties": {} })
}

fn collection_schema() -> Value {
    json!({
        "type": "object",
        "properties": {
            "start": {
                "type": "string",
                "description": "Start date/time in ISO 8601 format (e.g. 2024-01-01T00:00:00Z). Only records starting at or after this time."
            },
            "end": {
                "type": "string",
                "description": "End date/time in ISO 8601 format (e.g. 2024-12-31T23:59:59Z). Only records ending at or before this time."
            },
            "limit": {
                "type": "integer",
                "description": "Maximum number of records to return (1-25, default: 10).",
                "minimum": 1,
                "maximum": 25
            },
            "next_token": {
                "type": "string",
                "description": "Pagination token from the previous response's next_token."
            }
        }
    })
}

fn id_schema(key: &str, ty: &str, description: &str) -> Value {
    json!({
        "type": "object",
        "properties": {
            key: { "type": ty, "description": description }
        },
        "required": [key]
    })
}

// ─────────────────────────────────────────────────────────────────────────────
// Tool
// ─────────────────────────────────────────────────────────────────────────────

/// A WHOOP endpoint bound to a client.
#[derive(Clone)]
pub struct ApiTool {
    endpoint: Endpoint,
    client: WhoopClient,
}

impl ApiTool {
    pub fn new(endpoint: Endpoint, client: WhoopClient) -> Self {
        Self { endpoint, client }
    }

    fn collection_query(args: &ToolArgs) -> Result<CollectionQuery> {
        let limit = args.optional_int("limit")?.unwrap_or(DEFAULT_LIMIT);
        let mut query = CollectionQuery::new().limit(limit);
        if let Some(start) = args.optional_str("start")? {
            query = query.start(start);
        }
        if let Some(end) = args.optional_str("end")? {
            query = query.end(end);
        }
        if let Some(token) = args.optional_str("next_token")? {
            query = query.next_token(token);
        }
        Ok(query)
    }
}

/// Convert a client result into a tool result.
fn respond<T: Serialize>(result: whoop_client::Result<T>) -> CallToolResult {
    match result {
        Ok(data) => CallToolResult::json(&data),
        Err(e) => CallToolResult::error(format_error(&e)),
    }
}

#[async_trait]
impl Tool for ApiTool {
    fn name(&self) -> &str {
        self.endpoint.name()
    }

    fn description(&self) -> &str {
        self.endpoint.description()
    }

    fn parameters(&self) -> Value {
        self.endpoint.parameters()
    }

    async fn execute(&self, args: ToolArgs, _ctx: &ToolContext) -> Result<CallToolResult> {
        let client = &self.client;
        let result = match self.endpoint {
            Endpoint::UserProfile => respond(client.user().profile().await),
            Endpoint::BodyMeasurements => respond(client.user().body_measurements().await),
            Endpoint::Cycles => {
                let query = Self::collection_query(&args)?;
                respond(client.cycles().list(&query).await)
            }
            Endpoint::CycleById => {
                let id = args.required_int("cycle_id")?;
                respond(client.cycles().get(id).await)
            }
            Endpoint::Sleeps => {
                let query = Self::collection_query(&args)?;
                respond(client.sleep().list(&query).await)
            }
            Endpoint::SleepById => {
                let id = args.required_str("sleep_id")?;
                respond(client.sleep().get(&id).await)
            }
            Endpoint::SleepForCycle => {
                let id = args.required_int("cycle_id")?;
                respond(client.cycles().sleep(id).await)
            }
            Endpoint::Recoveries => {
                let query = Self::collection_query(&args)?;
                respond(client.recovery().list(&query).await)
            }
            Endpoint::RecoveryForCycle => {
                let id = args.required_int("cycle_id")?;
                respond(client.cycles().recovery(id).await)
            }
            Endpoint::Workouts => {
                let query = Self::collection_query(&args)?;
                respond(client.workouts().list(&query).await)
            }
            Endpoint::WorkoutById => {
                let id = args.required_str("workout_id")?;
                respond(client.workouts().get(&id).await)
            }
            Endpoint::ActivityMapping => {
                let id = args.required_int("activity_v1_id")?;
                respond(client.activity().mapping(id).await)
            }
        };
        Ok(result)
    }
}

/// Register every WHOOP data tool.
pub fn register_api_tools(registry: &mut ToolRegistry, client: &WhoopClient) {
    for endpoint in Endpoint::ALL {
        registry.register(ApiTool::new(endpoint, client.clone()));
    }
}

/// User-facing message for a failed API call.
pub fn format_error(err: &whoop_client::Error) -> String {
    use whoop_client::Error;
    use whoop_oauth::OAuthError;

    match err {
        e if e.is_unauthorized() => "Authentication failed: invalid or expired access token. \
             Use whoop_authorize to re-authenticate or set WHOOP_ACCESS_TOKEN."
            .to_string(),
        Error::Token(OAuthError::TokenExpired) => "Authentication failed: the stored token has \
             expired and cannot be refreshed. Use whoop_authorize to re-authenticate."
            .to_string(),
        e if e.is_not_found() => "Resource not found: the requested ID does not exist or you \
             don't have access to it."
            .to_string(),
        e if e.is_rate_limited() => {
            "Rate limited: too many requests. Please wait a moment and try again.".to_string()
        }
        Error::Api { status, message } => {
            format!("WHOOP API error (status {}): {}", status, message)
        }
        Error::InvalidArgument(msg) => msg.clone(),
        other => format!("Error: {}", other),
    }
}
