use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "wiki-widgets")]
#[command(about = "Auto purge, edit ages and skin links for MediaWiki pages")]
#[command(version)]
pub struct Args {
    /// Path to a JSON configuration file
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Override the api.php endpoint
    #[arg(long)]
    pub api_url: Option<String>,

    /// Override the file purge flags are kept in
    #[arg(long)]
    pub store: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Open a page in a WebDriver browser and run auto purge on it
    Visit {
        /// Full URL of the wiki page
        url: String,
    },

    /// Run one auto purge page load without a browser
    Purge {
        /// Page name as in wgPageName, e.g. Main_Page
        title: String,

        /// Site name as in wgSiteName
        #[arg(short, long)]
        site: String,

        /// Treat the page as qualifying even if the config does not list it
        #[arg(long)]
        qualify: bool,
    },

    /// Print how long ago a page was last edited
    Age {
        /// Page title
        title: String,
    },

    /// Print who created and who last edited a page
    History {
        /// Full URL of the wiki page
        url: String,
    },

    /// Print the skin switcher placement and links for a page as JSON
    Skins {
        /// Full URL of the wiki page
        url: String,

        /// Skin the page is currently shown in
        #[arg(short, long, default_value = "vector")]
        skin: String,
    },
}
