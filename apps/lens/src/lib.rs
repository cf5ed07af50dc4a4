use std::{collections::BTreeSet, path::PathBuf, sync::Arc};

use clap::{Parser, Subcommand};
use color_eyre::eyre;
use time::{OffsetDateTime, format_description::well_known::Rfc3339};
use tracing_subscriber::EnvFilter;

use lens_domain::{
	FilterKey, MediaItem, MediaType, NewAccount, PreferencePatch, ProfileView, QueryState,
	SearchField, SearchPage, SortBy, SortDirection,
};
use lens_remote::AuthClient;
use lens_service::{LensService, SearchOutcome};
use lens_store::ClientStore;

#[derive(Debug, Parser)]
#[command(
	version = lens_cli::VERSION,
	rename_all = "kebab",
	styles = lens_cli::styles(),
)]
pub struct Args {
	#[arg(long, short = 'c', value_name = "FILE")]
	pub config: PathBuf,
	#[command(subcommand)]
	pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
	/// Create an account.
	Register {
		#[arg(long)]
		username: String,
		#[arg(long)]
		email: String,
		#[arg(long)]
		password: String,
		#[arg(long)]
		first_name: Option<String>,
		#[arg(long)]
		last_name: Option<String>,
	},
	/// Sign in and store the credential pair.
	Login {
		#[arg(long)]
		username: String,
		#[arg(long)]
		password: String,
	},
	/// Sign out and purge stored credentials.
	Logout,
	/// Show the signed-in account.
	Whoami,
	/// Show another user's public profile.
	Profile { username: String },
	/// Show or update preferences.
	Prefs {
		#[command(subcommand)]
		action: Option<PrefsAction>,
	},
	/// Run a search.
	Search(SearchArgs),
	/// Show one media record.
	Show { id: String },
	/// Add or remove a favourite.
	Favourite {
		id: String,
		#[arg(long)]
		remove: bool,
	},
	/// List favourites.
	Favourites {
		#[arg(long, value_name = "N", default_value_t = 20)]
		limit: u32,
	},
	/// Inspect or prune search history.
	History {
		#[command(subcommand)]
		action: Option<HistoryAction>,
	},
	/// Inspect or maintain the result cache.
	Cache {
		#[command(subcommand)]
		action: CacheAction,
	},
	/// List the filter values the API knows about.
	Filters,
}

#[derive(Debug, Subcommand)]
pub enum PrefsAction {
	/// Print the current preferences.
	Show,
	/// Update one or more preference fields.
	Set {
		#[arg(long, value_name = "BOOL")]
		public_profile: Option<bool>,
		#[arg(long, value_name = "BOOL")]
		show_sensitive: Option<bool>,
		#[arg(long, value_name = "BOOL")]
		blur_sensitive: Option<bool>,
	},
}

#[derive(Debug, Subcommand)]
pub enum HistoryAction {
	/// List recorded searches.
	List {
		#[arg(long, value_name = "N", default_value_t = 1)]
		page: u32,
	},
	/// Delete one history entry.
	Delete { id: i64 },
	/// Delete the whole history.
	Clear,
}

#[derive(Debug, Subcommand)]
pub enum CacheAction {
	/// Print entry and byte counts.
	Stats,
	/// Drop expired entries.
	Purge,
	/// Drop every cached result page.
	Clear,
}

#[derive(Debug, clap::Args)]
pub struct SearchArgs {
	/// The search term.
	pub term: String,
	/// Field to search in: query, title, tag or creator.
	#[arg(long, value_name = "FIELD", default_value = "query")]
	pub by: String,
	/// Media type: image or audio.
	#[arg(long, value_name = "TYPE")]
	pub media_type: Option<String>,
	#[arg(long, value_name = "N")]
	pub page: Option<u32>,
	#[arg(long, value_name = "N")]
	pub page_size: Option<u32>,
	/// Include sensitive results regardless of the stored preference.
	#[arg(long)]
	pub mature: bool,
	#[arg(long, value_name = "VALUES", value_delimiter = ',')]
	pub license: Vec<String>,
	#[arg(long, value_name = "VALUES", value_delimiter = ',')]
	pub extension: Vec<String>,
	#[arg(long, value_name = "VALUES", value_delimiter = ',')]
	pub source: Vec<String>,
	/// Sort key: relevance or indexed_on.
	#[arg(long, value_name = "KEY")]
	pub sort_by: Option<String>,
	/// Sort direction: asc or desc.
	#[arg(long, value_name = "DIR")]
	pub sort_dir: Option<String>,
}

pub async fn run(args: Args) -> color_eyre::Result<()> {
	let mut config = lens_config::load(&args.config)?;

	config.client.user_agent.get_or_insert_with(|| lens_cli::USER_AGENT.to_string());

	init_tracing(&config)?;

	let store = Arc::new(ClientStore::open(&config.storage)?);
	let remote = Arc::new(AuthClient::new(&config, store.clone())?);
	let service = LensService::new(config, store, remote);

	if service.session.hydrate().await? {
		tracing::debug!("Session restored from stored credentials.");
	}

	match args.command {
		Command::Register { username, email, password, first_name, last_name } => {
			let account = NewAccount { username, email, password, first_name, last_name };
			let user = service.session.sign_up(&account).await?;

			println!("Account {} created. Sign in with `lens login`.", user.username);
		},
		Command::Login { username, password } => {
			service.session.sign_in(&username, &password).await?;

			println!("Signed in as {username}.");
		},
		Command::Logout => {
			service.session.sign_out().await?;

			println!("Signed out.");
		},
		Command::Whoami => match service.session.user() {
			Some(user) => println!("{}", serde_json::to_string_pretty(&user)?),
			None => println!("Not signed in."),
		},
		Command::Profile { username } => match service.session.profile(&username).await? {
			ProfileView::Private => println!("This profile is private."),
			ProfileView::Public(user) => println!("{}", serde_json::to_string_pretty(&user)?),
		},
		Command::Prefs { action } => match action.unwrap_or(PrefsAction::Show) {
			PrefsAction::Show =>
				println!("{}", serde_json::to_string_pretty(&service.session.preferences())?),
			PrefsAction::Set { public_profile, show_sensitive, blur_sensitive } => {
				let patch = PreferencePatch { public_profile, show_sensitive, blur_sensitive };

				if patch.is_empty() {
					println!("Nothing to update.");
				} else {
					service.session.update_preferences(patch).await?;

					println!(
						"{}",
						serde_json::to_string_pretty(&service.session.preferences())?
					);
				}
			},
		},
		Command::Search(search_args) => {
			let state = query_state(&search_args, service.cfg.search.page_size)?;

			match service.search(&state).await? {
				SearchOutcome::Cached(page) | SearchOutcome::Fetched(page) => print_page(&page),
				SearchOutcome::Superseded => {},
			}
		},
		Command::Show { id } => {
			let item = service.media_detail(&id).await?;

			println!("{}", serde_json::to_string_pretty(&item)?);
		},
		Command::Favourite { id, remove } =>
			if remove {
				service.unfavourite(&id).await?;

				println!("Removed favourite {id}.");
			} else {
				service.favourite(&id).await?;

				println!("Favourited {id}.");
			},
		Command::Favourites { limit } => {
			let items = service.favourites(limit).await?;

			if items.is_empty() {
				println!("No favourites.");
			} else {
				print_items(&items);
			}
		},
		Command::History { action } => match action.unwrap_or(HistoryAction::List { page: 1 }) {
			HistoryAction::List { page } => {
				let history = service.history(page).await?;

				if history.results.is_empty() {
					println!("No recorded searches.");
				}

				for entry in &history.results {
					println!(
						"{}  {}  {}",
						entry.id,
						entry.searched_at.format(&Rfc3339)?,
						entry.query
					);
				}
			},
			HistoryAction::Delete { id } => {
				service.delete_history_entry(id).await?;

				println!("Deleted history entry {id}.");
			},
			HistoryAction::Clear => {
				service.clear_history().await?;

				println!("Search history cleared.");
			},
		},
		Command::Cache { action } => match action {
			CacheAction::Stats => {
				let stats = service.store.cache_stats()?;

				println!("{} cached pages, {} bytes.", stats.entries, stats.bytes);
			},
			CacheAction::Purge => {
				let purged = service.store.purge_expired(OffsetDateTime::now_utc())?;

				println!("Purged {purged} expired entries.");
			},
			CacheAction::Clear => {
				let removed = service.store.clear_search_cache()?;

				println!("Removed {removed} cache entries.");
			},
		},
		Command::Filters => {
			let options = service.filter_options().await?;

			println!("tags: {}", options.tags.join(", "));
			println!("sources: {}", options.sources.join(", "));
		},
	}

	Ok(())
}

fn init_tracing(config: &lens_config::Config) -> color_eyre::Result<()> {
	let filter =
		EnvFilter::try_new(&config.client.log_level).unwrap_or_else(|_| EnvFilter::new("info"));
	tracing_subscriber::fmt().with_env_filter(filter).init();
	Ok(())
}

fn query_state(args: &SearchArgs, default_page_size: u32) -> color_eyre::Result<QueryState> {
	let field = SearchField::from_param(&args.by)
		.ok_or_else(|| eyre::eyre!("Unknown search field {:?}.", args.by))?;
	let mut state = QueryState::new(field, args.term.clone());

	if let Some(media_type) = &args.media_type {
		state.set_media_type(
			MediaType::from_param(media_type)
				.ok_or_else(|| eyre::eyre!("Unknown media type {:?}.", media_type))?,
		);
	}
	if let Some(sort_by) = &args.sort_by {
		state.sort_by = SortBy::from_param(sort_by)
			.ok_or_else(|| eyre::eyre!("Unknown sort key {:?}.", sort_by))?;
	}
	if let Some(sort_dir) = &args.sort_dir {
		state.sort_dir = SortDirection::from_param(sort_dir)
			.ok_or_else(|| eyre::eyre!("Unknown sort direction {:?}.", sort_dir))?;
	}
	if args.mature {
		state.mature = Some(true);
	}

	toggle_all(&mut state, FilterKey::License, &args.license);
	toggle_all(&mut state, FilterKey::Extension, &args.extension);
	toggle_all(&mut state, FilterKey::Source, &args.source);

	state.set_page_size(args.page_size.unwrap_or(default_page_size));

	if let Some(page) = args.page {
		state.set_page(page);
	}

	Ok(state)
}

// Repeated values would otherwise toggle a filter back off.
fn toggle_all(state: &mut QueryState, key: FilterKey, values: &[String]) {
	for value in values.iter().collect::<BTreeSet<_>>() {
		state.toggle_filter(key, value);
	}
}

fn print_page(page: &SearchPage) {
	if page.results.is_empty() {
		println!("No results.");

		return;
	}

	println!("{} of {} results, page {}.", page.results.len(), page.total_count, page.page);
	print_items(&page.results);

	if page.has_more() {
		println!("More may be available with --page {}.", page.page + 1);
	}
}

fn print_items(items: &[MediaItem]) {
	for item in items {
		println!(
			"{}  {}  [{}]",
			item.id,
			item.title.as_deref().unwrap_or("(untitled)"),
			item.license.as_deref().unwrap_or("unknown license"),
		);
	}
}
