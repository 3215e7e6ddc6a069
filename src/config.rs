use crate::cli::{CliAction, EventsOf, ParamsAction};
use crate::error::InputError;
use crate::michelson::validate_address;
use crate::x4c::numeric::{parse_amount, parse_nat};
use anyhow::{anyhow, Context, Result};
use clap::{App, AppSettings, Arg, ArgMatches, SubCommand};
use num::BigUint;
use std::ffi::OsString;
use std::fs;

#[derive(Clone, Debug, SmartDefault)]
pub struct Config {
    #[default(_code = "\"https://api.tzkt.io\".to_string()")]
    pub tzkt_url: String,
    #[default(_code = "\"https://tzkt.io\".to_string()")]
    pub tzkt_web_url: String,
    #[default = 3]
    pub indexer_comm_retries: i32,

    pub contracts: Vec<ContractID>,
    pub action: Option<CliAction>,
}

#[derive(
    Hash, Eq, PartialEq, Clone, Default, Debug, Serialize, Deserialize,
)]
pub struct ContractID {
    pub address: String,
    pub name: String,
}

lazy_static! {
    pub static ref CONFIG: Result<Config> = init_config();
}
pub const X4C_VERSION: &str = env!("CARGO_PKG_VERSION");

impl Config {
    /// Accepts either the name of a contract from the settings file or a
    /// plain address.
    pub fn resolve_contract(&self, name_or_address: &str) -> Result<String> {
        if let Some(cid) = self
            .contracts
            .iter()
            .find(|c| c.name == name_or_address)
        {
            return Ok(cid.address.clone());
        }
        validate_address(name_or_address).with_context(|| {
            format!("{:?} is neither a known contract nor an address", name_or_address)
        })?;
        Ok(name_or_address.to_string())
    }

    pub fn contract_link(&self, address: &str) -> String {
        format!("{}/{}", self.tzkt_web_url.trim_end_matches('/'), address)
    }
}

fn contract_arg() -> Arg<'static, 'static> {
    Arg::with_name("contract")
        .value_name("CONTRACT")
        .help("contract name (from the contract settings) or address")
        .required(true)
        .takes_value(true)
}

fn value_arg(name: &'static str, help: &'static str) -> Arg<'static, 'static> {
    Arg::with_name(name)
        .long(name)
        .value_name(name)
        .help(help)
        .required(true)
        .takes_value(true)
}

pub fn build_app() -> App<'static, 'static> {
    App::new("x4c")
        .version(X4C_VERSION)
        .author("Quantify Earth <dev@quantify.earth>")
        .about("Inspect custodian and FA2 carbon credit contracts, and build their parameters")
        .setting(AppSettings::SubcommandRequiredElseHelp)
        .arg(
            Arg::with_name("tzkt_url")
                .long("tzkt-url")
                .value_name("TZKT_URL")
                .env("TZKT_URL")
                .default_value("https://api.tzkt.io")
                .help("The URL of the TzKT indexer API")
                .takes_value(true))
        .arg(
            Arg::with_name("tzkt_web_url")
                .long("tzkt-web-url")
                .value_name("TZKT_WEB_URL")
                .env("TZKT_WEB_URL")
                .default_value("https://tzkt.io")
                .help("The URL of the TzKT explorer, used for printing links")
                .takes_value(true))
        .arg(
            Arg::with_name("indexer_comm_retries")
                .long("indexer-comm-retries")
                .value_name("INDEXER_COMM_RETRIES")
                .env("INDEXER_COMM_RETRIES")
                .default_value("3")
                .help("The number of times to retry an indexer call on transient errors, set to smaller than 0 for infinite")
                .takes_value(true))
        .arg(
            Arg::with_name("contract_settings")
                .short("c")
                .long("contract-settings")
                .value_name("CONTRACT_SETTINGS")
                .env("CONTRACT_SETTINGS")
                .help("path to the settings yaml (named contracts)")
                .takes_value(true))
        .arg(
            Arg::with_name("contracts")
                .long("contracts")
                .value_name("CONTRACTS")
                .help("set of additional named contracts (in syntax: <name>=<address>)")
                .multiple(true)
                .number_of_values(1)
                .takes_value(true))
        .subcommand(
            SubCommand::with_name("custodian-info")
                .about("print custodian storage, ledgers and metadata")
                .arg(contract_arg()))
        .subcommand(
            SubCommand::with_name("fa2-info")
                .about("print FA2 storage, ledger and token metadata")
                .arg(contract_arg()))
        .subcommand(
            SubCommand::with_name("events")
                .about("print the events a contract emitted")
                .arg(contract_arg())
                .arg(
                    Arg::with_name("fa2")
                        .long("fa2")
                        .help("the contract is an FA2 contract (only retire events)")
                        .takes_value(false)))
        .subcommand(
            SubCommand::with_name("fa2-snapshot")
                .about("save the full state of an FA2 contract as JSON")
                .arg(contract_arg())
                .arg(
                    Arg::with_name("out")
                        .short("o")
                        .long("out")
                        .value_name("FILE")
                        .help("write to FILE instead of stdout")
                        .takes_value(true)))
        .subcommand(
            SubCommand::with_name("fa2-origination-storage")
                .about("print initial storage (Micheline JSON) for a new FA2 contract holding a snapshot")
                .arg(
                    Arg::with_name("snapshot")
                        .value_name("SNAPSHOT")
                        .required(true)
                        .takes_value(true)))
        .subcommand(
            SubCommand::with_name("custodian-origination-storage")
                .about("print initial storage (Micheline JSON) for a new custodian contract")
                .arg(
                    Arg::with_name("owner")
                        .value_name("OWNER")
                        .required(true)
                        .takes_value(true)))
        .subcommand(
            SubCommand::with_name("params")
                .about("print contract call parameters (Micheline JSON)")
                .setting(AppSettings::SubcommandRequiredElseHelp)
                .subcommand(
                    SubCommand::with_name("internal-mint")
                        .arg(value_arg("token-address", "FA2 contract of the tokens"))
                        .arg(value_arg("token-ids", "token ids (format: single number, or a range with format from-to, comma separated)")))
                .subcommand(
                    SubCommand::with_name("internal-transfer")
                        .arg(value_arg("token-address", "FA2 contract of the token"))
                        .arg(value_arg("token-id", "token id"))
                        .arg(value_arg("amount", "amount to move"))
                        .arg(value_arg("from", "current kyc"))
                        .arg(value_arg("to", "new kyc")))
                .subcommand(
                    SubCommand::with_name("update-internal-operators")
                        .arg(value_arg("kyc", "owner kyc"))
                        .arg(value_arg("operator", "operator address"))
                        .arg(value_arg("token-id", "token id"))
                        .arg(value_arg("update-type", "add (1) or remove (2)")))
                .subcommand(
                    SubCommand::with_name("retire")
                        .arg(value_arg("token-address", "FA2 contract of the token"))
                        .arg(value_arg("token-id", "token id"))
                        .arg(value_arg("kyc", "kyc of the retiring party"))
                        .arg(value_arg("amount", "amount to retire"))
                        .arg(value_arg("reason", "reason for retiring")))
                .subcommand(
                    SubCommand::with_name("add-token-id")
                        .arg(value_arg("token-id", "token id"))
                        .arg(value_arg("title", "project title"))
                        .arg(value_arg("url", "project url")))
                .subcommand(
                    SubCommand::with_name("mint")
                        .arg(value_arg("token-id", "token id"))
                        .arg(value_arg("owner", "address receiving the tokens"))
                        .arg(value_arg("amount", "amount to mint"))))
}

// init config and return it also.
pub fn init_config() -> Result<Config> {
    let matches = build_app().get_matches();
    config_from_matches(&matches)
}

pub fn parse_config<I, T>(args: I) -> Result<Config>
where
    I: IntoIterator<Item = T>,
    T: Into<OsString> + Clone,
{
    let matches = build_app().get_matches_from_safe(args)?;
    config_from_matches(&matches)
}

// clap guarantees presence of required and defaulted args
fn value(matches: &ArgMatches, name: &str) -> String {
    matches
        .value_of(name)
        .unwrap_or_default()
        .to_string()
}

fn config_from_matches(matches: &ArgMatches) -> Result<Config> {
    let mut config = Config {
        tzkt_url: value(matches, "tzkt_url"),
        tzkt_web_url: value(matches, "tzkt_web_url"),
        indexer_comm_retries: value(matches, "indexer_comm_retries")
            .parse::<i32>()
            .context("invalid indexer comm retries")?,
        ..Config::default()
    };

    if let Some(fpath) = matches.value_of("contract_settings") {
        info!("loading contract settings from {}", fpath);
        config.contracts = parse_contract_settings_file(fpath)?;
    }
    if let Some(contracts) = matches.values_of("contracts") {
        for s in contracts {
            match s.split_once('=') {
                Some((name, address)) => config.contracts.push(ContractID {
                    name: name.to_string(),
                    address: address.to_string(),
                }),
                None => {
                    return Err(anyhow!(
                        "bad contract arg format (expected: <name>=<address>, got {})",
                        s
                    ))
                }
            }
        }
    }
    for cid in &config.contracts {
        validate_address(&cid.address)
            .with_context(|| format!("contract setting {:?}", cid.name))?;
    }

    config.action = match matches.subcommand() {
        ("custodian-info", Some(m)) => Some(CliAction::CustodianInfo {
            contract: config.resolve_contract(&value(m, "contract"))?,
        }),
        ("fa2-info", Some(m)) => Some(CliAction::FA2Info {
            contract: config.resolve_contract(&value(m, "contract"))?,
        }),
        ("events", Some(m)) => Some(CliAction::Events {
            contract: config.resolve_contract(&value(m, "contract"))?,
            of: if m.is_present("fa2") {
                EventsOf::FA2
            } else {
                EventsOf::Custodian
            },
        }),
        ("fa2-snapshot", Some(m)) => Some(CliAction::FA2Snapshot {
            contract: config.resolve_contract(&value(m, "contract"))?,
            out: m.value_of("out").map(String::from),
        }),
        ("fa2-origination-storage", Some(m)) => {
            Some(CliAction::FA2OriginationStorage {
                snapshot: value(m, "snapshot"),
            })
        }
        ("custodian-origination-storage", Some(m)) => {
            Some(CliAction::CustodianOriginationStorage {
                owner: config.resolve_contract(&value(m, "owner"))?,
            })
        }
        ("params", Some(m)) => {
            Some(CliAction::Params(params_action(&config, m)?))
        }
        _ => None,
    };

    debug!("Config={:#?}", config);
    Ok(config)
}

fn params_action(config: &Config, matches: &ArgMatches) -> Result<ParamsAction> {
    let nat = |m: &ArgMatches, name: &'static str| -> Result<BigUint, InputError> {
        parse_nat(name, &value(m, name))
    };
    let amount = |m: &ArgMatches| -> Result<BigUint, InputError> {
        parse_amount("amount", &value(m, "amount"))
    };

    Ok(match matches.subcommand() {
        ("internal-mint", Some(m)) => ParamsAction::InternalMint {
            token_address: config.resolve_contract(&value(m, "token-address"))?,
            token_ids: range(&value(m, "token-ids"))?,
        },
        ("internal-transfer", Some(m)) => ParamsAction::InternalTransfer {
            token_address: config.resolve_contract(&value(m, "token-address"))?,
            token_id: nat(m, "token-id")?,
            amount: amount(m)?,
            from: value(m, "from"),
            to: value(m, "to"),
        },
        ("update-internal-operators", Some(m)) => {
            ParamsAction::UpdateInternalOperators {
                kyc: value(m, "kyc"),
                operator: config.resolve_contract(&value(m, "operator"))?,
                token_id: nat(m, "token-id")?,
                update_type: value(m, "update-type").parse()?,
            }
        }
        ("retire", Some(m)) => ParamsAction::Retire {
            token_address: config.resolve_contract(&value(m, "token-address"))?,
            token_id: nat(m, "token-id")?,
            kyc: value(m, "kyc"),
            amount: amount(m)?,
            reason: value(m, "reason"),
        },
        ("add-token-id", Some(m)) => ParamsAction::AddTokenId {
            token_id: nat(m, "token-id")?,
            title: value(m, "title"),
            url: value(m, "url"),
        },
        ("mint", Some(m)) => ParamsAction::Mint {
            token_id: nat(m, "token-id")?,
            owner: config.resolve_contract(&value(m, "owner"))?,
            amount: amount(m)?,
        },
        (other, _) => return Err(anyhow!("unknown params command {:?}", other)),
    })
}

// upper bound on the ids a single from-to range expands to
const MAX_RANGE_SPAN: u64 = 10_000;

// get range of args in the form 1,2,3 or 1-3. All ranges inclusive.
fn range(arg: &str) -> Result<Vec<BigUint>> {
    let num = |s: &str| parse_nat("token id", s.trim()).map_err(anyhow::Error::from);

    let mut result: Vec<BigUint> = vec![];
    for h in arg.split(',') {
        match h.split_once('-') {
            Some((from, to)) => {
                let (from, to) = (num(from)?, num(to)?);
                if from > to {
                    return Err(anyhow!("bad range {} (from > to)", h));
                }
                if &to - &from >= BigUint::from(MAX_RANGE_SPAN) {
                    return Err(InputError::RangeTooLarge {
                        range: h.to_string(),
                        max: MAX_RANGE_SPAN,
                    }
                    .into());
                }
                let mut i = from;
                while i <= to {
                    result.push(i.clone());
                    i += 1u32;
                }
            }
            None => result.push(num(h)?),
        }
    }
    result.sort_unstable();
    result.dedup();
    Ok(result)
}

fn parse_contract_settings_file(fpath: &str) -> Result<Vec<ContractID>> {
    let content = fs::read_to_string(fpath)
        .with_context(|| format!("failed to read {}", fpath))?;
    parse_contract_settings(&content)
}

fn parse_contract_settings(content: &str) -> Result<Vec<ContractID>> {
    #[derive(Serialize, Deserialize)]
    struct ParseType {
        contracts: Vec<ContractID>,
    }
    let res: ParseType = serde_yaml::from_str(content)?;
    Ok(res.contracts)
}
