use clap::{Parser, Subcommand};
use logos_client::Result;
use logos_client::commands::{run_analyses, run_chat, run_correct, run_search, show_session};
use logos_client::config::{run_interactive_config, show_config};
use logos_client::gateway::SearchKind;
use logos_client::workspace::AnalysisType;

#[derive(Parser)]
#[command(name = "logos")]
#[command(about = "Search, analyze and discuss scripture with the LogosAI service")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show the backend configuration, or edit it interactively
    Config {
        /// Edit the configuration interactively
        #[arg(long)]
        edit: bool,
    },
    /// Establish the anonymous session and report its status
    Session,
    /// Search scripture for passages
    Search {
        /// Free-text query
        query: String,
        /// Index to search
        #[arg(long, value_enum, default_value_t = SearchKind::Verse)]
        kind: SearchKind,
    },
    /// Search, then analyze the passages found
    Analyze {
        /// Free-text query
        query: String,
        #[arg(long, value_enum, default_value_t = SearchKind::Verse)]
        kind: SearchKind,
        /// Analysis to run, may be repeated. Runs every analysis when omitted.
        #[arg(long = "type", value_enum)]
        types: Vec<AnalysisType>,
    },
    /// Search, then ask the assistant about the passages found
    Chat {
        /// Free-text query used to gather context
        query: String,
        /// Question for the assistant
        message: String,
        #[arg(long, value_enum, default_value_t = SearchKind::Verse)]
        kind: SearchKind,
    },
    /// Ask the service for a spelling correction
    Correct {
        /// Text to correct
        text: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Config { edit } => {
            if edit {
                run_interactive_config()?;
            } else {
                show_config()?;
            }
        }
        Commands::Session => {
            show_session().await?;
        }
        Commands::Search { query, kind } => {
            run_search(&query, kind).await?;
        }
        Commands::Analyze { query, kind, types } => {
            run_analyses(&query, kind, &types).await?;
        }
        Commands::Chat {
            query,
            message,
            kind,
        } => {
            run_chat(&query, &message, kind).await?;
        }
        Commands::Correct { text } => {
            run_correct(&text).await?;
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::error::ErrorKind;

    #[test]
    fn search_defaults_to_verse_index() {
        let cli = Cli::try_parse_from(["logos", "search", "creation"]);
        assert!(cli.is_ok());

        if let Ok(parsed) = cli {
            if let Commands::Search { query, kind } = parsed.command {
                assert_eq!(query, "creation");
                assert_eq!(kind, SearchKind::Verse);
            } else {
                panic!("expected search command");
            }
        }
    }

    #[test]
    fn search_with_chapter_index() {
        let cli = Cli::try_parse_from(["logos", "search", "creation", "--kind", "chapter"]);
        assert!(cli.is_ok());

        if let Ok(parsed) = cli {
            if let Commands::Search { kind, .. } = parsed.command {
                assert_eq!(kind, SearchKind::Chapter);
            }
        }
    }

    #[test]
    fn analyze_collects_repeated_types() {
        let cli = Cli::try_parse_from([
            "logos",
            "analyze",
            "creation",
            "--type",
            "thematic",
            "--type",
            "socio-rhetorical",
        ]);
        assert!(cli.is_ok());

        if let Ok(parsed) = cli {
            if let Commands::Analyze { types, .. } = parsed.command {
                assert_eq!(
                    types,
                    vec![AnalysisType::Thematic, AnalysisType::SocioRhetorical]
                );
            } else {
                panic!("expected analyze command");
            }
        }
    }

    #[test]
    fn analyze_without_types() {
        let cli = Cli::try_parse_from(["logos", "analyze", "creation"]);

        if let Ok(Cli {
            command: Commands::Analyze { types, .. },
        }) = cli
        {
            assert!(types.is_empty());
        } else {
            panic!("expected analyze command");
        }
    }

    #[test]
    fn analyze_rejects_unknown_type() {
        let cli = Cli::try_parse_from(["logos", "analyze", "creation", "--type", "mystical"]);
        assert!(cli.is_err());

        if let Err(err) = cli {
            assert_eq!(err.kind(), ErrorKind::InvalidValue);
        }
    }

    #[test]
    fn analyze_rejects_suggestion_type() {
        let cli = Cli::try_parse_from(["logos", "analyze", "creation", "--type", "interactive_qa"]);
        assert!(cli.is_err());

        if let Err(err) = cli {
            assert_eq!(err.kind(), ErrorKind::InvalidValue);
        }
    }

    #[test]
    fn chat_takes_query_and_message() {
        let cli = Cli::try_parse_from(["logos", "chat", "creation", "Who made the world?"]);
        assert!(cli.is_ok());

        if let Ok(parsed) = cli {
            if let Commands::Chat { query, message, .. } = parsed.command {
                assert_eq!(query, "creation");
                assert_eq!(message, "Who made the world?");
            }
        }
    }

    #[test]
    fn config_edit_flag() {
        let cli = Cli::try_parse_from(["logos", "config", "--edit"]);
        assert!(cli.is_ok());

        if let Ok(parsed) = cli {
            if let Commands::Config { edit } = parsed.command {
                assert!(edit);
            }
        }
    }

    #[test]
    fn invalid_command() {
        let cli = Cli::try_parse_from(["logos", "invalid"]);
        assert!(cli.is_err());

        if let Err(err) = cli {
            assert_eq!(err.kind(), ErrorKind::InvalidSubcommand);
        }
    }

    #[test]
    fn help_message() {
        let cli = Cli::try_parse_from(["logos", "--help"]);
        assert!(cli.is_err());

        if let Err(err) = cli {
            assert_eq!(err.kind(), ErrorKind::DisplayHelp);
        }
    }
}
