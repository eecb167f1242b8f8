use std::path::PathBuf;

use clap::{Parser, Subcommand};

use otc_provider::config::{DEFAULT_REGION, ProviderConfig};
use otc_provider::error::AppError;

#[derive(Parser, Debug)]
#[command(author, version, about)]
pub struct Cli {
    #[command(subcommand)]
    pub command: ProviderCommand,
}

#[derive(Subcommand, Debug)]
pub enum ProviderCommand {
    #[command(name = "opentelekomcloud")]
    OpenTelekomCloud {
        #[command(flatten)]
        auth: AuthArgs,

        /// State file location. Defaults to the user data directory.
        #[arg(long, env = "OTC_STATE_FILE")]
        state_file: Option<PathBuf>,

        #[command(subcommand)]
        command: OtcCommand,
    },
}

#[derive(Subcommand, Debug)]
pub enum OtcCommand {
    /// Show what apply would change
    Plan(ManifestArgs),
    /// Create, update and delete resources until state matches the manifest
    Apply(ManifestArgs),
    /// Re-read every stored resource
    Refresh,
    /// Delete every stored resource
    Destroy,
    /// Adopt an existing resource
    Import(ImportArgs),
    /// Read the data sources declared in a manifest
    Data(ManifestArgs),
    /// Print stored state
    State,
    /// List supported resource and data source types
    Resources,
}

#[derive(clap::Args, Debug)]
pub struct AuthArgs {
    #[arg(long, env = "OS_AUTH_TOKEN", hide_env_values = true)]
    pub token: Option<String>,

    #[arg(long, env = "OS_REGION_NAME", default_value = DEFAULT_REGION)]
    pub region: String,

    #[arg(long, env = "OS_PROJECT_ID")]
    pub project_id: Option<String>,

    /// Send every request to this base URL instead of the regional endpoints
    #[arg(long, env = "OTC_ENDPOINT")]
    pub endpoint: Option<String>,
}

impl AuthArgs {
    pub fn provider_config(&self) -> Result<ProviderConfig, AppError> {
        let token = self
            .token
            .as_deref()
            .filter(|t| !t.is_empty())
            .ok_or_else(|| AppError::Auth("no token, set OS_AUTH_TOKEN or pass --token".to_string()))?;

        let mut config = ProviderConfig::new(token);
        config.region = self.region.clone();
        config.project_id = self.project_id.clone();
        config.endpoint_override = self.endpoint.clone();
        Ok(config)
    }
}

#[derive(clap::Args, Debug)]
pub struct ManifestArgs {
    #[arg(short, long, default_value = "otc.json")]
    pub manifest: PathBuf,
}

#[derive(clap::Args, Debug)]
pub struct ImportArgs {
    /// Address to store the resource under, `type.name`
    pub address: String,

    /// Cloud-side id of the resource
    pub id: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;
    use serial_test::serial;

    const VARS: [&str; 5] = [
        "OS_AUTH_TOKEN",
        "OS_REGION_NAME",
        "OS_PROJECT_ID",
        "OTC_ENDPOINT",
        "OTC_STATE_FILE",
    ];

    /// Parses with the provider variables cleared, restoring them afterwards.
    fn parse_clean(args: &[&str], env: &[(&str, &str)]) -> Cli {
        let backup: Vec<(&str, Option<String>)> =
            VARS.iter().map(|v| (*v, std::env::var(v).ok())).collect();
        unsafe {
            for var in VARS {
                std::env::remove_var(var);
            }
            for (key, value) in env {
                std::env::set_var(key, value);
            }
        }

        let cli = Cli::parse_from(args.iter().copied());

        unsafe {
            for (var, value) in backup {
                match value {
                    Some(value) => std::env::set_var(var, value),
                    None => std::env::remove_var(var),
                }
            }
        }
        cli
    }

    fn unwrap_otc(cli: Cli) -> (AuthArgs, Option<PathBuf>, OtcCommand) {
        let ProviderCommand::OpenTelekomCloud {
            auth,
            state_file,
            command,
        } = cli.command;
        (auth, state_file, command)
    }

    #[test]
    fn test_plan_with_manifest_flag() {
        let cli = Cli::parse_from([
            "otc-provider",
            "opentelekomcloud",
            "--token=abc",
            "plan",
            "--manifest=infra.json",
        ]);
        let (auth, _, command) = unwrap_otc(cli);
        assert_eq!(auth.token, Some("abc".to_string()));
        match command {
            OtcCommand::Plan(args) => assert_eq!(args.manifest, PathBuf::from("infra.json")),
            other => panic!("Expected Plan command, got {:?}", other),
        }
    }

    #[test]
    fn test_import_positional_args() {
        let cli = Cli::parse_from([
            "otc-provider",
            "opentelekomcloud",
            "import",
            "opentelekomcloud_networking_port_v2.web",
            "3b2c1f0e",
        ]);
        let (_, _, command) = unwrap_otc(cli);
        match command {
            OtcCommand::Import(args) => {
                assert_eq!(args.address, "opentelekomcloud_networking_port_v2.web");
                assert_eq!(args.id, "3b2c1f0e");
            }
            other => panic!("Expected Import command, got {:?}", other),
        }
    }

    #[test]
    #[serial]
    fn test_defaults_without_env() {
        let cli = parse_clean(&["otc-provider", "opentelekomcloud", "apply"], &[]);
        let (auth, state_file, command) = unwrap_otc(cli);

        assert!(auth.token.is_none());
        assert_eq!(auth.region, "eu-de");
        assert!(auth.project_id.is_none());
        assert!(auth.endpoint.is_none());
        assert!(state_file.is_none());
        match command {
            OtcCommand::Apply(args) => assert_eq!(args.manifest, PathBuf::from("otc.json")),
            other => panic!("Expected Apply command, got {:?}", other),
        }
    }

    #[test]
    #[serial]
    fn test_env_var_fallback() {
        let cli = parse_clean(
            &["otc-provider", "opentelekomcloud", "state"],
            &[
                ("OS_AUTH_TOKEN", "env_token"),
                ("OS_REGION_NAME", "eu-nl"),
                ("OS_PROJECT_ID", "proj-1"),
                ("OTC_ENDPOINT", "http://localhost:8080"),
                ("OTC_STATE_FILE", "/tmp/otc-state.json"),
            ],
        );
        let (auth, state_file, _) = unwrap_otc(cli);

        assert_eq!(auth.token, Some("env_token".to_string()));
        assert_eq!(auth.region, "eu-nl");
        assert_eq!(auth.project_id, Some("proj-1".to_string()));
        assert_eq!(auth.endpoint, Some("http://localhost:8080".to_string()));
        assert_eq!(state_file, Some(PathBuf::from("/tmp/otc-state.json")));
    }

    #[test]
    #[serial]
    fn test_cli_flag_takes_precedence_over_env() {
        let cli = parse_clean(
            &["otc-provider", "opentelekomcloud", "--token=cli_token", "refresh"],
            &[("OS_AUTH_TOKEN", "env_token")],
        );
        let (auth, _, _) = unwrap_otc(cli);
        assert_eq!(auth.token, Some("cli_token".to_string()));
    }

    #[test]
    #[serial]
    fn test_provider_config_requires_token() {
        let cli = parse_clean(&["otc-provider", "opentelekomcloud", "destroy"], &[]);
        let (auth, _, _) = unwrap_otc(cli);
        assert!(matches!(auth.provider_config(), Err(AppError::Auth(_))));
    }

    #[test]
    #[serial]
    fn test_provider_config_from_args() {
        let cli = parse_clean(
            &[
                "otc-provider",
                "opentelekomcloud",
                "--token=abc",
                "--region=eu-nl",
                "--endpoint=http://127.0.0.1:9000",
                "resources",
            ],
            &[],
        );
        let (auth, _, _) = unwrap_otc(cli);
        let config = auth.provider_config().unwrap();
        assert_eq!(config.token, "abc");
        assert_eq!(config.region, "eu-nl");
        assert_eq!(config.endpoint_override.as_deref(), Some("http://127.0.0.1:9000"));
    }
}
