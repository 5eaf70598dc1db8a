use clap::Parser;
use std::error::Error;
use url::Url;
use wiki_widgets::browser::BrowserPage;
use wiki_widgets::purge::{DetachedPage, LoadOutcome};
use wiki_widgets::{AutoPurge, Config, FileStore, PageContext, WikiApi, skins, time};

mod args;
use args::{Args, Command};

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    // Initialize logging
    env_logger::init();

    let args = Args::parse();

    let mut config = match &args.config {
        Some(path) => Config::from_file(path)?,
        None => Config::default(),
    };
    if let Some(api_url) = args.api_url {
        config.api_url = api_url;
    }
    if let Some(store) = args.store {
        config.store_path = store;
    }
    // Override the WebDriver URL with an environment variable if provided
    if let Ok(webdriver_url) = std::env::var("WEBDRIVER_URL") {
        if !webdriver_url.is_empty() {
            config.webdriver_url = webdriver_url;
        }
    }

    match args.command {
        Command::Visit { url } => visit(&config, &url).await,
        Command::Purge {
            title,
            site,
            qualify,
        } => purge(&config, &title, &site, qualify).await,
        Command::Age { title } => age(&config, &title).await,
        Command::History { url } => history(&config, &url).await,
        Command::Skins { url, skin } => {
            let menu = skins::menu(&Url::parse(&url)?, &skin);
            println!("{}", serde_json::to_string_pretty(&menu)?);
            Ok(())
        }
    }
}

async fn visit(config: &Config, url: &str) -> Result<(), Box<dyn Error>> {
    let mut page = BrowserPage::connect(&config.webdriver_url).await?;
    page.open(url).await?;

    let mut auto_purge = AutoPurge::new(
        FileStore::open(&config.store_path),
        WikiApi::new(&config.api_url)?,
        config.qualifying_pages(),
    );

    let result = auto_purge.run(&mut page).await;

    if let Err(e) = page.close().await {
        ::log::warn!("Failed to close browser session: {}", e);
    }

    for (i, outcome) in result?.iter().enumerate() {
        report(i + 1, outcome);
    }
    Ok(())
}

async fn purge(
    config: &Config,
    title: &str,
    site: &str,
    qualify: bool,
) -> Result<(), Box<dyn Error>> {
    let mut qualifying = config.qualifying_pages();
    if qualify {
        qualifying.insert(title.to_string());
    }

    let mut auto_purge = AutoPurge::new(
        FileStore::open(&config.store_path),
        WikiApi::new(&config.api_url)?,
        qualifying,
    );

    let ctx = PageContext::new(title, site);
    let mut page = DetachedPage::new(ctx.clone());
    let outcome = auto_purge.on_page_load(&ctx, &mut page).await?;
    report(1, &outcome);
    Ok(())
}

async fn age(config: &Config, title: &str) -> Result<(), Box<dyn Error>> {
    let api = WikiApi::new(&config.api_url)?;
    let revision = api.latest_revision(title).await?;
    println!(
        "{}\t{}",
        revision.user,
        time::format_since(revision.timestamp, &config.unit_words)
    );
    Ok(())
}

async fn history(config: &Config, url: &str) -> Result<(), Box<dyn Error>> {
    let api = WikiApi::new(&config.api_url)?;
    let ctx = PageContext::from_html(&api.fetch_page(url).await?)?;

    if !config.revision_info.applies_to(&ctx) {
        ::log::info!(
            "{} (namespace {:?}) is not covered by revision_info, skipping",
            ctx.page_name,
            ctx.namespace
        );
        return Ok(());
    }

    let created = api.first_revision(&ctx.page_name).await?;
    println!(
        "created by {} on {} (revision {})",
        created.user,
        created.timestamp.format("%a, %d %b %Y, %H:%M:%S (UTC)"),
        created
            .revid
            .map_or_else(|| "?".to_string(), |id| id.to_string())
    );

    let last = api.latest_revision(&ctx.page_name).await?;
    let mut line = format!(
        "last edited by {} {}",
        last.user,
        time::format_since(last.timestamp, &config.unit_words)
    );
    if let Some(diff) = last.diff_to {
        line.push_str(&format!(" (diff {})", diff));
    }
    if last.minor {
        line.push_str(" [m]");
    }
    println!("{}", line);
    if let Some(summary) = last.parsedcomment.filter(|s| !s.is_empty()) {
        println!("summary: {}", summary);
    }
    Ok(())
}

fn report(load: usize, outcome: &LoadOutcome) {
    match outcome {
        LoadOutcome::Idle => println!("load {}: nothing to do", load),
        LoadOutcome::Reloaded => println!("load {}: purged and reloaded", load),
        LoadOutcome::Rejected(error) => println!("load {}: purge rejected: {}", load, error),
        LoadOutcome::Failed(error) => println!("load {}: purge failed: {}", load, error),
    }
}
