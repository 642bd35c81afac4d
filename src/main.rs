#![warn(clippy::pedantic)]
#![allow(clippy::unreadable_literal, clippy::too_many_lines)]

mod cli;
mod error;
mod rpc;

use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use nyx_core::config::BotConfig;
use nyx_core::data::database::Database;
use nyx_core::data::structs::Data;
use poise::serenity_prelude as serenity;
use tracing::{error, info, warn};

use crate::cli::Args;

#[tokio::main]
async fn main() {
    let args = Args::parse();
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(args.log_filter())),
        )
        .init();

    if args.banner {
        println!("{}", cli::banner());
    }
    if args.news {
        println!("{}", cli::news());
    }

    let mut config = match BotConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            error!(error = %e, "Failed to load configuration");
            std::process::exit(1);
        }
    };
    if let Some(token) = args.token.clone() {
        config.token = Some(token);
    }
    let Some(token) = config.token.clone() else {
        error!("No token given, set `DISCORD_TOKEN` or pass `--token`");
        std::process::exit(1);
    };

    let commands = match nyx_commands::commands(&args.cog_selection()) {
        Ok(commands) => commands,
        Err(e) => {
            error!(error = %e, "Invalid cog selection");
            std::process::exit(1);
        }
    };
    info!(commands = commands.len(), "Commands loaded");

    let database = match Database::connect(&config.database_url, config.guild_defaults()).await {
        Ok(database) => Arc::new(database),
        Err(e) => {
            error!(error = %e, "Failed to initialize database");
            std::process::exit(1);
        }
    };
    if let Err(e) = database.load_caches().await {
        error!(error = %e, "Failed to load the settings caches");
        std::process::exit(1);
    }

    let reqwest = match reqwest::Client::builder()
        .user_agent(concat!("nyx/", env!("CARGO_PKG_VERSION")))
        .timeout(Duration::from_secs(30))
        .build()
    {
        Ok(client) => client,
        Err(e) => {
            error!(error = %e, "Failed to build the http client");
            std::process::exit(1);
        }
    };

    let dev_guild = args.dev.then_some(config.dev_guild).flatten();
    if args.dev && dev_guild.is_none() {
        warn!("`--dev` without `DEV_GUILD_ID`, registering slash commands globally");
    }
    let rpc_bind = config.rpc_bind;
    let rpc_secret = config.rpc_secret.clone();

    let data = Data::new(database.clone(), config, reqwest);
    let commands_run = data.commands_run.clone();
    let time_started = data.time_started;

    let options = poise::FrameworkOptions {
        commands,
        prefix_options: poise::PrefixFrameworkOptions {
            dynamic_prefix: Some(|ctx| {
                Box::pin(async move {
                    let prefix = match ctx.guild_id {
                        Some(guild_id) => ctx.data.guild_settings(guild_id).prefix,
                        None => ctx.data.database.defaults().prefix,
                    };
                    Ok(Some(prefix))
                })
            }),
            edit_tracker: Some(Arc::new(poise::EditTracker::for_timespan(
                Duration::from_secs(600),
            ))),
            ..Default::default()
        },

        on_error: |error| Box::pin(error::handler(error)),

        command_check: Some(|ctx| Box::pin(nyx_commands::utils::command_check(ctx))),

        event_handler: |ctx, event, framework, data| {
            Box::pin(nyx_events::event_handler(ctx, event, framework, data))
        },

        post_command: |ctx| {
            Box::pin(async move {
                ctx.data().commands_run.fetch_add(1, Ordering::Relaxed);
            })
        },

        // owner gating reads the reloadable config instead.
        initialize_owners: false,
        skip_checks_for_owners: false,
        ..Default::default()
    };

    let framework = poise::Framework::builder()
        .options(options)
        .setup(move |ctx, ready, framework| {
            Box::pin(async move {
                let commands = &framework.options().commands;
                if let Some(guild_id) = dev_guild {
                    poise::builtins::register_in_guild(ctx, commands, guild_id).await?;
                    info!(%guild_id, "Slash commands registered to guild");
                } else {
                    poise::builtins::register_globally(ctx, commands).await?;
                    info!("Slash commands registered globally");
                }

                let state = rpc::RpcState {
                    cache: ctx.cache.clone(),
                    database,
                    commands_run,
                    time_started,
                    secret: rpc_secret,
                };
                tokio::spawn(rpc::serve(rpc_bind, state));

                info!(bot = %ready.user.name, "Framework ready");
                Ok(data)
            })
        })
        .build();

    let intents = serenity::GatewayIntents::GUILDS
        | serenity::GatewayIntents::GUILD_MEMBERS
        | serenity::GatewayIntents::GUILD_MESSAGES
        | serenity::GatewayIntents::GUILD_MESSAGE_REACTIONS
        | serenity::GatewayIntents::DIRECT_MESSAGES
        | serenity::GatewayIntents::MESSAGE_CONTENT;

    let mut client = match serenity::ClientBuilder::new(token, intents)
        .framework(framework)
        .await
    {
        Ok(client) => client,
        Err(e) => {
            error!(error = %e, "Failed to create the client");
            std::process::exit(1);
        }
    };

    let shard_manager = client.shard_manager.clone();
    tokio::spawn(async move {
        shutdown_signal().await;
        info!("Shutdown signal received, stopping shards");
        shard_manager.shutdown_all().await;
    });

    if let Err(e) = client.start_autosharded().await {
        error!(error = %e, "Client error");
    }
    info!("Shut down");
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!(error = %e, "Could not listen for ctrl-c");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                error!(error = %e, "Could not listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }
}
