pub fn generate_starter_config() -> String {
    r#"# =============================================================================
# HOURLY EXPORT CONFIGURATION
# =============================================================================
# Polls a DynamoDB table for new rows every poll interval, accumulates them into
# an hourly batch and keeps a CSV file per hour up to date on Google Drive.
#
# Values of the form $env{NAME} are replaced with the environment variable NAME
# before the file is parsed. Unset variables are reported as errors.
#
# Config file locations (in order of precedence):
#   1. Path specified via --config argument
#   2. ~/.config/hourly-export/config.yml
#   3. /etc/hourly-export/config.yml

# =============================================================================
# SOURCE
# =============================================================================
source:
  table: $env{DYNAMODB_TABLE_NAME}
  region: us-east-1
  # Attribute holding the row timestamp, formatted YYYY-MM-DDTHH:MM:SSZ (UTC)
  timestamp_field: datetime_utc
  # Static credentials. Remove both to use the default AWS credential chain.
  access_key_id: $env{AWS_ACCESS_KEY_ID}
  secret_access_key: $env{AWS_SECRET_ACCESS_KEY}
  # How far back the first poll after startup reaches
  initial_lookback: 1h

# =============================================================================
# STORE
# =============================================================================
store:
  # Service account key file (JSON). Remove to use the application default
  # credentials (GOOGLE_APPLICATION_CREDENTIALS or `gcloud auth
  # application-default login`). Tokens are refreshed before they expire.
  credentials_file: $env{GOOGLE_DRIVE_CREDENTIALS_FILE}
  # A fixed OAuth access token can be used instead for short runs. It is never
  # refreshed and stops working after about an hour.
  # access_token: $env{GOOGLE_DRIVE_ACCESS_TOKEN}
  # Folder the hourly files are created in
  folder_id: $env{GOOGLE_DRIVE_FOLDER_ID}
  # Uncomment when the folder lives on a shared drive
  # shared_drive_id: $env{GOOGLE_SHARED_DRIVE_ID}
  timeout: 60s

# =============================================================================
# EXPORT
# =============================================================================
export:
  # Files are named {name_prefix}_{YYYYMMDD_HH}.csv
  name_prefix: locness_data
  # Clock used for the hour label: 'local' or 'utc'
  label_zone: local

# =============================================================================
# SCHEDULE
# =============================================================================
schedule:
  poll_interval: 1m

# =============================================================================
# LOGGING
# =============================================================================
# Uncomment to also write logs to a file (stdout is always used)
# logging:
#   file: ~/.local/state/hourly-export/app.log
"#
    .to_string()
}
