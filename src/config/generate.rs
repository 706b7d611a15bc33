pub fn generate_starter_config() -> String {
    r#"# =============================================================================
# LOGTALLY CONFIGURATION
# =============================================================================
# Loads a CSV export of SDK events, repairs the event timestamps, and raises an
# alert for every time bucket whose record count reaches a rule's threshold.
#
# Config file locations (in order of precedence):
#   1. Path specified via --config argument
#   2. ~/.config/logtally/config.yml
#   3. /etc/logtally/config.yml
#
# Any value may reference an environment variable with the $env{...} form.

# =============================================================================
# INPUT
# =============================================================================

input:
  # CSV file with one header row. To read it from the FILEPATH environment
  # variable, use the $env{...} form with that name.
  path: /var/log/sdk/events.csv
  # The header row is skipped, columns are matched by position
  has_header: true

# =============================================================================
# SCHEMA
# =============================================================================
# Column names in file order. Every row must have exactly this many fields.
# Omit 'fields' to use the standard SDK event export layout.

schema:
  fields:
    - error_code
    - error_message
    - severity
    - log_location
    - mode
    - model
    - graphics
    - session_id
    - sdkv
    - test_mode
    - flow_id
    - flow_type
    - sdk_date
    - publisher_id
    - game_id
    - bundle_id
    - appv
    - language
    - os
    - adv_id
    - gdpr
    - ccpa
    - country_code
    - date
  # Columns holding timestamps to normalize at load
  date_fields:
    - sdk_date

# =============================================================================
# TIMESTAMP REPAIR
# =============================================================================

timestamp:
  # Order of the numeric components in the raw text
  field_order: [day, month, year, hour, minute, second]
  # Unparseable timestamp: 'drop' (skip the record) or 'abort' (fail the run)
  on_parse_error: drop
  # Day/month readable either way: 'accept', 'warn', or 'drop'
  on_ambiguous: accept

# =============================================================================
# PRE-FILTER
# =============================================================================
# Records must satisfy every predicate before any rule sees them.
# Modes: 'equals', 'greater_than', 'greater_or_equal'
# Values are text: quote numbers so YAML keeps them as written ("1.10", "0").

prefilter:
  - field: severity
    value: Error
  - field: error_code
    value: "0"
    mode: greater_than

# =============================================================================
# ALERT RULES
# =============================================================================
# granularity: year, month, day, hour, minute, or second
# threshold:   alert when a bucket holds at least this many records
# filter:      optional; count only records whose field compares to the value

rules:
  - name: error_burst
    date_field: sdk_date
    granularity: minute
    threshold: 10

  - name: bundle_errors
    date_field: sdk_date
    granularity: hour
    threshold: 10
    filter:
      field: bundle_id
      value: com.example.app
      mode: equals

# =============================================================================
# OUTPUT
# =============================================================================

output:
  # 'text' lines or one 'json' object per rule
  format: text
  # 'log' (tracing, info level) or 'stdout'
  sink: log
"#
    .to_string()
}
