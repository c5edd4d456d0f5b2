use std::env;
use std::io::{self, BufRead, Write as _};

use hive_schedule::{
    Authenticator, Credentials, Day, Error, HiveClient, MessageLogMode, ProfileStore,
    SetDayScheduleRequest, Session, parse_entries,
};

/// Set one day of a node's heating schedule.
///
/// Usage: set_schedule <node_id> <day> [HH:MM=temp ...] [--profile <name>] [--log]
/// Credentials come from HIVE_USERNAME / HIVE_PASSWORD; profiles (if used)
/// from profiles.json in the working directory.
#[tokio::main]
async fn main() -> hive_schedule::Result<()> {
    tracing_subscriber::fmt::init();

    let args: Vec<String> = env::args().collect();
    let node_id = args
        .get(1)
        .expect("usage: set_schedule <node_id> <day> [HH:MM=temp ...] [--profile <name>] [--log]");
    let day = args
        .get(2)
        .and_then(|d| Day::from_api_str(d))
        .expect("day must be one of monday..sunday");
    let username = env::var("HIVE_USERNAME").expect("HIVE_USERNAME not set");
    let password = env::var("HIVE_PASSWORD").expect("HIVE_PASSWORD not set");

    let profile = args
        .iter()
        .position(|a| a == "--profile")
        .and_then(|i| args.get(i + 1))
        .cloned();
    let use_log = args.iter().any(|a| a == "--log");

    let pairs: Vec<(String, f64)> = args[3..]
        .iter()
        .filter(|a| !a.starts_with("--") && a.contains('='))
        .map(|spec| {
            let (time, temp) = spec.split_once('=').expect("entry must look like 06:30=18.0");
            (
                time.to_string(),
                temp.parse().expect("temperature must be a number"),
            )
        })
        .collect();

    let auth = Authenticator::builder().build();
    let credentials = Credentials::new(&username, &password);
    let tokens = match auth.login(&credentials).await {
        Ok(tokens) => tokens,
        Err(Error::MfaRequired) => {
            print!("MFA code: ");
            io::stdout().flush()?;
            let mut code = String::new();
            io::stdin().lock().read_line(&mut code)?;
            auth.login(&credentials.clone().with_mfa_code(code.trim()))
                .await?
        }
        Err(e) => return Err(e),
    };
    let mut session = Session::new(tokens);

    let mut builder = HiveClient::builder(auth);
    if profile.is_some() {
        builder = builder.profiles(ProfileStore::from_path("profiles.json")?);
    }
    if use_log {
        builder = builder.message_log(MessageLogMode::Full, "hive_schedule.ndjson");
        println!("Logging requests to hive_schedule.ndjson");
    }
    let mut client = builder.build();

    let request = match (profile, pairs.is_empty()) {
        (Some(name), true) => SetDayScheduleRequest::with_profile(node_id, day, name),
        (_, false) => SetDayScheduleRequest::with_entries(node_id, day, parse_entries(&pairs)?),
        (None, true) => {
            eprintln!("no entries given, using the default day");
            SetDayScheduleRequest::with_entries(
                node_id,
                day,
                parse_entries(&[("06:30", 18.0), ("22:00", 16.0)])?,
            )
        }
    };

    let updated = client.set_day_schedule(&mut session, &request).await?;
    println!("Updated {} for node {node_id}:", updated.day);
    for entry in &updated.entries {
        println!("  {} -> {:.1}\u{00b0}C", entry.time, entry.target);
    }
    Ok(())
}
