use std::env;
use std::io::{self, BufRead, Write as _};

use hive_schedule::{Authenticator, Credentials, Day, Error, HiveClient, Session};

/// Print a node's current weekly schedule, if the vendor lets us read it.
///
/// Usage: read_schedule <node_id>
/// Credentials come from HIVE_USERNAME / HIVE_PASSWORD.
#[tokio::main]
async fn main() -> hive_schedule::Result<()> {
    tracing_subscriber::fmt::init();

    let args: Vec<String> = env::args().collect();
    let node_id = args.get(1).expect("usage: read_schedule <node_id>");
    let username = env::var("HIVE_USERNAME").expect("HIVE_USERNAME not set");
    let password = env::var("HIVE_PASSWORD").expect("HIVE_PASSWORD not set");

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
    let session = Session::new(tokens);

    let mut client = HiveClient::builder(auth)
        .on_schedule(|node_id, days| {
            println!("schedule event for node {node_id} ({} days)", days.len());
        })
        .build();

    match client.get_current_schedule(&session, node_id).await {
        Ok(days) => {
            for day in Day::ALL {
                let Some(schedule) = days.iter().find(|d| d.day == day) else {
                    continue;
                };
                println!("{day}:");
                for entry in &schedule.entries {
                    println!("  {} -> {:.1}\u{00b0}C", entry.time, entry.target);
                }
            }
        }
        Err(Error::Http { status: 403, message }) => {
            eprintln!("read rejected by the vendor (expected for third-party callers): {message}");
        }
        Err(e) => return Err(e),
    }
    Ok(())
}
