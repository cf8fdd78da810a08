use clap::{ArgAction, Parser, Subcommand};
use dialoguer::Select;
use humansize::{DECIMAL, format_size};
use std::path::PathBuf;
use std::process;
use std::time::Duration;
use streamer_catalog::{
    CachedMetadataProvider, CatalogResolver, Config, ConfigError, ConfigOverrides,
    HttpPlaybackClient, LocalFs, MdbListProvider, MediaDispatcher, MediaFs, MediaType,
    MetadataProvider, PlaybackResponse, Requester, SearchHit, SelectionCache, StreamerError,
    TimeLeft, parse_duration, truncate_sorted_episodes,
};
use tracing::warn;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(author, version, about = "Find and stream movies and shows from a media library")]
struct Cli {
    /// Configuration file (defaults to config.json in the user config directory)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Movies root, overriding the configuration
    #[arg(long, global = true)]
    movies: Option<PathBuf>,

    /// TV shows root, overriding the configuration
    #[arg(long, global = true)]
    tv: Option<PathBuf>,

    /// More log output (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Search movie and show folders
    Search { query: String },

    /// List the media files of the first matching movie folder
    Movies { query: String },

    /// Show the season and episode tree of every matching show folder
    Shows {
        #[arg(required = true)]
        queries: Vec<String>,
    },

    /// Print the sorted, truncated episode list sent for a show
    ///
    /// Seasons after the boundary (by default from the configuration) are left out.
    Episodes {
        /// Exact leading part of the show folder name
        show: String,

        /// Seasons sorting after this name are dropped
        #[arg(long)]
        boundary: Option<String>,
    },

    /// Print the largest media file of the first matching movie folder
    Largest { query: String },

    /// Fuzzy-find a movie file or episode by title
    Find { title: String },

    /// Play a movie or show
    Play {
        query: String,
        #[arg(long)]
        season: Option<u32>,
        #[arg(long)]
        episode: Option<u32>,
        #[command(flatten)]
        requester: RequesterArgs,
    },

    /// Play a movie for a limited time (e.g. 30s, 5m, 6h, 1d, 1w)
    Schedule {
        query: String,
        #[arg(value_parser = duration_arg)]
        duration: u64,
        /// Runtime of the movie, in the same format
        #[arg(long, value_parser = duration_arg)]
        movie_duration: Option<u64>,
        #[command(flatten)]
        requester: RequesterArgs,
    },

    /// Pause playback
    Pause,

    /// Resume playback
    Resume,

    /// Stop playback
    Stop,

    /// Show the playback service status
    Status,

    /// Show how long scheduled playback still runs
    TimeLeft,

    /// Look up a title on MDBList by IMDb id
    Details { imdb_id: String },
}

#[derive(clap::Args, Debug)]
struct RequesterArgs {
    /// Guild the request is made for
    #[arg(long, default_value = "cli")]
    guild: String,

    /// Author of the request
    #[arg(long, default_value = "cli")]
    author: String,
}

impl RequesterArgs {
    fn requester(&self) -> Requester {
        Requester::new(&self.guild, &self.author)
    }
}

fn duration_arg(value: &str) -> Result<u64, String> {
    parse_duration(value)
        .ok_or_else(|| format!("invalid duration '{value}', use e.g. 30s, 5m, 6h, 1d or 1w"))
}

/// Installs the stderr log subscriber; `RUST_LOG` wins over `-v`
fn init_tracing(verbose: u8) {
    let level = match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

type Dispatcher = MediaDispatcher<HttpPlaybackClient>;

fn dispatcher(config: &Config) -> Dispatcher {
    MediaDispatcher::new(
        CatalogResolver::new(config.media_root()),
        HttpPlaybackClient::new(config.playback_url.clone()),
        SelectionCache::new(config.selection_ttl(), config.selection_capacity),
        config.truncation_boundary.clone(),
    )
}

fn describe_hit(hit: &SearchHit) -> String {
    match &hit.imdb_id {
        Some(imdb_id) => format!("[{}] {} ({imdb_id})", hit.media_type, hit.folder),
        None => format!("[{}] {}", hit.media_type, hit.folder),
    }
}

/// Lets the user choose when a search found several hits
fn pick_hit(hits: &[SearchHit]) -> Option<&SearchHit> {
    match hits {
        [] => None,
        [only] => Some(only),
        _ => {
            let items: Vec<String> = hits.iter().map(describe_hit).collect();
            let choice = Select::new()
                .with_prompt("Several matches, pick one")
                .items(&items)
                .default(0)
                .interact_opt();

            match choice {
                Ok(choice) => choice.map(|index| &hits[index]),
                Err(e) => {
                    warn!(error = %e, "cannot prompt for a choice");
                    eprintln!("Several matches, please narrow the query:");
                    for item in items {
                        eprintln!("  {item}");
                    }
                    None
                }
            }
        }
    }
}

fn print_response(response: &PlaybackResponse) {
    match response.message() {
        Some(message) => println!("{} {}", response.status, message),
        None => println!("{} {}", response.status, response.data),
    }
}

fn run(cli: Cli) -> Result<(), StreamerError> {
    let overrides = ConfigOverrides {
        movies_path: cli.movies,
        tv_path: cli.tv,
    };
    let config = Config::load(cli.config.as_deref(), overrides)?;
    let resolver = CatalogResolver::new(config.media_root());

    match cli.command {
        Command::Search { query } => {
            let hits = dispatcher(&config).search(&query, &Requester::new("cli", "cli"))?;
            if hits.is_empty() {
                println!("No media found matching the query: {query}");
            }
            for hit in &hits {
                println!("{}", describe_hit(hit));
                println!("    {}", hit.path.display());
            }
        }

        Command::Movies { query } => match resolver.movie_files(&query)? {
            Some(movie) => {
                println!("{}", movie.name);
                for path in &movie.files {
                    let size = LocalFs.file_size(path)?;
                    println!("  {} ({})", path.display(), format_size(size, DECIMAL));
                }
            }
            None => println!("No movie files found for: {query}"),
        },

        Command::Shows { queries } => {
            for bucket in resolver.tv_show_files(&queries)? {
                println!("{}", bucket.query);
                if bucket.folders.is_empty() {
                    println!("  (no matching show folders)");
                }
                for show in &bucket.folders {
                    println!("  {}", show.name);
                    for season in &show.seasons {
                        println!("    {} ({} files)", season.name, season.episodes.len());
                    }
                }
            }
        }

        Command::Episodes { show, boundary } => match resolver.tv_show_files_extra(&show)? {
            Some(tree) => {
                let boundary = boundary.unwrap_or_else(|| config.truncation_boundary.clone());
                let sorted = resolver.sort_show_tree(&[tree]);
                for show in truncate_sorted_episodes(&sorted, &boundary).shows {
                    println!("{}", show.name);
                    for season in show.seasons {
                        println!("  {}", season.name);
                        for episode in season.episodes {
                            println!("    {}", episode.display());
                        }
                    }
                }
            }
            None => println!("No show folder starts with: {show}"),
        },

        Command::Largest { query } => match resolver.largest_media_file(&query)? {
            Some(file) => {
                let size = LocalFs.file_size(&file.path)?;
                println!("{}", file.title);
                println!("  {} ({})", file.path.display(), format_size(size, DECIMAL));
            }
            None => println!("No valid media files found for: {query}"),
        },

        Command::Find { title } => match resolver.find_media_file(&title)? {
            Some(path) => println!("{}", path.display()),
            None => println!("Nothing resembles: {title}"),
        },

        Command::Play {
            query,
            season,
            episode,
            requester,
        } => {
            let dispatcher = dispatcher(&config);
            let requester = requester.requester();
            let hits = dispatcher.search(&query, &requester)?;
            match pick_hit(&hits) {
                Some(hit) => {
                    let response = dispatcher.play(&hit.token, &requester, season, episode)?;
                    print_response(&response);
                }
                None if hits.is_empty() => println!("No media found matching the query: {query}"),
                None => {}
            }
        }

        Command::Schedule {
            query,
            duration,
            movie_duration,
            requester,
        } => {
            let dispatcher = dispatcher(&config);
            let requester = requester.requester();
            let movies: Vec<SearchHit> = dispatcher
                .search(&query, &requester)?
                .into_iter()
                .filter(|hit| hit.media_type == MediaType::Movies)
                .collect();
            match pick_hit(&movies) {
                Some(hit) => {
                    let response =
                        dispatcher.play_scheduled(&hit.token, &requester, duration, movie_duration)?;
                    print_response(&response);
                }
                None if movies.is_empty() => println!("No movie found matching the query: {query}"),
                None => {}
            }
        }

        Command::Pause => print_response(&dispatcher(&config).pause(&Requester::new("cli", "cli"))?),
        Command::Resume => {
            print_response(&dispatcher(&config).resume(&Requester::new("cli", "cli"))?)
        }
        Command::Stop => print_response(&dispatcher(&config).stop(&Requester::new("cli", "cli"))?),
        Command::Status => print_response(&dispatcher(&config).status()?),

        Command::TimeLeft => match dispatcher(&config).time_left(&Requester::new("cli", "cli"))? {
            TimeLeft::Remaining { formatted, .. } => println!("Time left: {formatted}"),
            TimeLeft::NotScheduled => println!("No media is currently scheduled to play."),
            TimeLeft::NoStream => println!("No current stream active."),
        },

        Command::Details { imdb_id } => {
            let api_key = config
                .mdblist_api_key
                .clone()
                .ok_or(ConfigError::Missing("mdblist_api_key"))?;
            let provider = CachedMetadataProvider::open(
                MdbListProvider::new(api_key),
                Some(config.metadata_cache_ttl()).filter(|ttl| *ttl > Duration::ZERO),
            )?;

            let details = provider.details(&imdb_id)?;
            println!("{} ({})", details.title, details.year);
            println!("  Type:     {}", details.kind);
            println!("  Released: {}", details.released);
            println!("  Runtime:  {} min", details.runtime);
            println!("  Score:    {:.1}/10", details.score_out_of_ten());
            if !details.poster.is_empty() {
                println!("  Poster:   {}", details.poster);
            }
            if !details.description.is_empty() {
                println!();
                println!("{}", details.description);
            }
        }
    }

    Ok(())
}

fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    if let Err(e) = run(cli) {
        eprintln!("Error: {e}");
        process::exit(1);
    }
}
