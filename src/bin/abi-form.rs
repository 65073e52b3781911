use std::process::ExitCode;

use anyhow::{anyhow, Context, Result};
use clap::{Arg, ArgAction, ArgMatches, Command};
use indexmap::IndexMap;
use tracing_subscriber::EnvFilter;

use phat_abi_form::abi::substrate::ContractAbi;
use phat_abi_form::Value;

fn cli() -> Command {
    let metadata = Arg::new("METADATA")
        .help("Contract metadata: a .contract bundle or metadata.json")
        .required(true);
    let message = Arg::new("MESSAGE")
        .help("Label of the message or constructor")
        .required(true);

    Command::new("abi-form")
        .version(env!("CARGO_PKG_VERSION"))
        .about("Build and check argument forms for ink! contract messages")
        .subcommand_required(true)
        .arg(
            Arg::new("VERBOSE")
                .help("More logging, repeat for more")
                .short('v')
                .long("verbose")
                .action(ArgAction::Count)
                .global(true),
        )
        .subcommand(
            Command::new("messages")
                .about("List constructors and messages with their arguments")
                .arg(metadata.clone()),
        )
        .subcommand(
            Command::new("form")
                .about("Print the field store built for a message")
                .arg(metadata.clone())
                .arg(message.clone()),
        )
        .subcommand(
            Command::new("check")
                .about("Validate arguments for a message and print them normalized")
                .arg(metadata)
                .arg(message)
                .arg(
                    Arg::new("ARG")
                        .help("Argument as label=value; value is JSON or plain text")
                        .short('a')
                        .long("arg")
                        .action(ArgAction::Append),
                ),
        )
}

fn init_logging(verbose: u8) {
    let default = match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn load(matches: &ArgMatches) -> Result<ContractAbi> {
    let path = matches
        .get_one::<String>("METADATA")
        .ok_or_else(|| anyhow!("missing metadata path"))?;

    ContractAbi::load(path).with_context(|| format!("cannot load contract metadata `{path}`"))
}

fn message_label(matches: &ArgMatches) -> Result<&String> {
    matches
        .get_one::<String>("MESSAGE")
        .ok_or_else(|| anyhow!("missing message label"))
}

fn messages(matches: &ArgMatches) -> Result<()> {
    let abi = load(matches)?;

    if let Some(name) = &abi.name {
        println!("contract {name}");
    }

    for (kind, list) in [("constructor", &abi.constructors), ("message", &abi.messages)] {
        for message in list.iter() {
            let args = message
                .args
                .iter()
                .map(|arg| format!("{}: {}", arg.label, abi.display_type(arg)))
                .collect::<Vec<_>>()
                .join(", ");

            let mut flags = String::new();
            if message.mutates {
                flags.push_str(" mut");
            }
            if message.payable {
                flags.push_str(" payable");
            }

            println!("{kind} {} {}({args}){flags}", message.selector, message.label);
        }
    }

    Ok(())
}

fn form(matches: &ArgMatches) -> Result<()> {
    let abi = load(matches)?;
    let message = abi.find(message_label(matches)?)?;
    let form = abi.form(message)?;

    let output = serde_json::json!({
        "formData": form.form_data,
        "fieldDataSet": form.field_data_set.values().collect::<Vec<_>>(),
    });

    println!("{}", serde_json::to_string_pretty(&output)?);

    Ok(())
}

fn check(matches: &ArgMatches) -> Result<bool> {
    let abi = load(matches)?;
    let message = abi.find(message_label(matches)?)?;

    let mut input = IndexMap::new();

    for arg in matches.get_many::<String>("ARG").into_iter().flatten() {
        let (label, text) = arg
            .split_once('=')
            .ok_or_else(|| anyhow!("argument `{arg}` is not of the form label=value"))?;

        if !message.args.iter().any(|declared| declared.label == label) {
            return Err(anyhow!("`{}` has no argument `{}`", message.label, label));
        }

        input.insert(label.to_owned(), Value::from_input(text));
    }

    let validated = abi.validate_args(message, &input)?;

    let mut valid = true;
    let mut output = IndexMap::new();

    for (label, result) in validated {
        for error in &result.errors {
            eprintln!("{label}: {error}");
            valid = false;
        }
        output.insert(label, result.value.unwrap_or_default());
    }

    if valid {
        println!("{}", serde_json::to_string_pretty(&output)?);
    }

    Ok(valid)
}

fn main() -> ExitCode {
    match try_main() {
        Ok(code) => code,
        Err(err) => {
            eprintln!("error: {err:#}");
            ExitCode::from(2)
        }
    }
}

fn try_main() -> Result<ExitCode> {
    let matches = cli().get_matches();

    init_logging(matches.get_count("VERBOSE"));

    let valid = match matches.subcommand() {
        Some(("messages", matches)) => messages(matches).map(|_| true)?,
        Some(("form", matches)) => form(matches).map(|_| true)?,
        Some(("check", matches)) => check(matches)?,
        _ => unreachable!("a subcommand is required"),
    };

    Ok(if valid {
        ExitCode::SUCCESS
    } else {
        ExitCode::from(1)
    })
}
