use std::fs;
use std::path::PathBuf;

use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};
use tracing::info;

use pinboard_api::transfer::backup_file_name;
use pinboard_api::{AuthStore, PinStore};
use pinboard_types::api::{NewBoard, NewComment, NewPin, ProfileUpdate, parse_tags};
use pinboard_types::models::{Pin, User};

use crate::config::Config;

#[derive(Parser, Debug)]
#[command(name = "pinboard")]
#[command(author, version, about = "Local image board: pins, boards, likes and backups", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Create an account and sign in
    Signup {
        #[arg(long)]
        username: String,
        #[arg(long)]
        email: String,
        #[arg(long)]
        password: String,
    },
    /// Sign in with email and password
    Login {
        #[arg(long)]
        email: String,
        #[arg(long)]
        password: String,
    },
    /// Sign out
    Logout,
    /// Show the signed-in user
    Whoami,
    /// Edit the signed-in user's profile
    Profile {
        #[arg(long)]
        username: Option<String>,
        #[arg(long)]
        email: Option<String>,
        #[arg(long)]
        avatar: Option<String>,
        #[arg(long)]
        bio: Option<String>,
        #[arg(long)]
        website: Option<String>,
    },
    /// Create, like, comment on and delete pins
    #[command(subcommand)]
    Pin(PinCommand),
    /// Organize pins into boards
    #[command(subcommand)]
    Board(BoardCommand),
    /// Search pins by title, description or tag
    Search { query: String },
    /// Show the newest pins, `page` loads deep
    Feed {
        #[arg(long, default_value_t = 0)]
        page: usize,
    },
    /// Write a backup of all pins and boards
    Export {
        /// Defaults to pinboard-backup-<date>.json
        #[arg(long)]
        out: Option<PathBuf>,
    },
    /// Replace all pins and boards with a backup
    Import { file: PathBuf },
}

#[derive(Subcommand, Debug)]
pub enum PinCommand {
    /// Create a pin owned by the signed-in user
    Add {
        #[arg(long)]
        title: String,
        #[arg(long)]
        image_url: String,
        #[arg(long, default_value = "")]
        description: String,
        #[arg(long)]
        link: Option<String>,
        /// Comma-separated
        #[arg(long, default_value = "")]
        tags: String,
    },
    /// Toggle your like on a pin
    Like { id: String },
    /// Comment on a pin
    Comment { id: String, text: String },
    /// Delete one of your pins
    Delete { id: String },
    /// Show a pin with its comments
    Show { id: String },
}

#[derive(Subcommand, Debug)]
pub enum BoardCommand {
    /// Create a board
    Create {
        #[arg(long)]
        name: String,
        #[arg(long, default_value = "")]
        description: String,
        #[arg(long)]
        secret: bool,
    },
    /// Delete one of your boards (pins are kept)
    Delete { id: String },
    /// Save a pin to a board
    AddPin { board: String, pin: String },
    /// Take a pin off a board
    RemovePin { board: String, pin: String },
    /// List a board's pins
    Show { id: String },
    /// List your boards
    List,
}

pub struct Session {
    pub config: Config,
    pub auth: AuthStore,
    pub pins: PinStore,
}

impl Session {
    pub fn run(&mut self, command: Command) -> Result<()> {
        match command {
            Command::Signup {
                username,
                email,
                password,
            } => {
                if !self.auth.signup(&username, &email, &password)? {
                    bail!("An account with {email} already exists");
                }
                println!("Welcome, {username}!");
            }
            Command::Login { email, password } => {
                if !self.auth.login(&email, &password)? {
                    bail!("Invalid email or password");
                }
                println!("Signed in as {}", self.user()?.username);
            }
            Command::Logout => {
                self.auth.logout()?;
                println!("Signed out");
            }
            Command::Whoami => {
                let user = self.user()?;
                println!("{} <{}> ({})", user.username, user.email, user.id);
                if let Some(bio) = user.bio.as_deref().filter(|b| !b.is_empty()) {
                    println!("{bio}");
                }
                println!(
                    "{} pins, {} boards",
                    self.pins.pins_by_user(&user.id).len(),
                    self.pins.boards_by_user(&user.id).len()
                );
            }
            Command::Profile {
                username,
                email,
                avatar,
                bio,
                website,
            } => {
                let updates = ProfileUpdate {
                    username,
                    email,
                    avatar,
                    bio,
                    website,
                };
                if !self.auth.update_profile(updates)? {
                    bail!("Profile not updated: sign in first, and pick an email nobody else uses");
                }
                println!("Profile updated");
            }
            Command::Pin(cmd) => self.run_pin(cmd)?,
            Command::Board(cmd) => self.run_board(cmd)?,
            Command::Search { query } => {
                let results = self.pins.search_pins(&query);
                if results.is_empty() {
                    println!("No pins match '{query}'");
                }
                for pin in results {
                    print_pin_line(pin);
                }
            }
            Command::Feed { page } => {
                for pin in self.pins.feed_page(page, self.config.page_size) {
                    print_pin_line(pin);
                }
            }
            Command::Export { out } => {
                let path = out.unwrap_or_else(|| {
                    PathBuf::from(backup_file_name(chrono::Local::now().date_naive()))
                });
                let data = self.pins.export_data()?;
                fs::write(&path, data).with_context(|| format!("writing {}", path.display()))?;
                info!("Exported backup to {}", path.display());
                println!("Saved {}", path.display());
            }
            Command::Import { file } => {
                let payload = fs::read_to_string(&file)
                    .with_context(|| format!("reading {}", file.display()))?;
                if !self.pins.import_data(&payload)? {
                    bail!("Failed to import data. Please check the file format.");
                }
                println!(
                    "Imported {} pins and {} boards",
                    self.pins.pins().len(),
                    self.pins.boards().len()
                );
            }
        }
        Ok(())
    }

    fn run_pin(&mut self, cmd: PinCommand) -> Result<()> {
        let user = self.user()?;
        match cmd {
            PinCommand::Add {
                title,
                image_url,
                description,
                link,
                tags,
            } => {
                let pin = self.pins.add_pin(NewPin {
                    title,
                    description,
                    image_url,
                    link,
                    user_id: user.id,
                    username: user.username,
                    user_avatar: user.avatar,
                    tags: parse_tags(&tags),
                    ..Default::default()
                })?;
                println!("Created pin {}", pin.id);
            }
            PinCommand::Like { id } => {
                if !self.pins.like_pin(&id, &user.id)? {
                    bail!("No pin {id}");
                }
                let liked = self.pins.is_liked_by(&id, &user.id);
                println!("{} pin {id}", if liked { "Liked" } else { "Unliked" });
            }
            PinCommand::Comment { id, text } => {
                let comment = NewComment {
                    user_id: user.id,
                    username: user.username,
                    user_avatar: user.avatar,
                    text,
                };
                if self.pins.add_comment(&id, comment)?.is_none() {
                    bail!("No pin {id}");
                }
                println!("Comment added");
            }
            PinCommand::Delete { id } => {
                let owner = self.pins.pin(&id).map(|p| p.user_id.clone());
                match owner {
                    None => bail!("No pin {id}"),
                    Some(owner) if owner != user.id => bail!("Only the owner can delete pin {id}"),
                    Some(_) => {
                        self.pins.delete_pin(&id)?;
                        println!("Deleted pin {id}");
                    }
                }
            }
            PinCommand::Show { id } => {
                let Some(pin) = self.pins.pin(&id) else {
                    bail!("No pin {id}");
                };
                print_pin_line(pin);
                if !pin.description.is_empty() {
                    println!("  {}", pin.description);
                }
                if let Some(link) = &pin.link {
                    println!("  {link}");
                }
                let boards: Vec<_> = self
                    .pins
                    .boards_containing(&pin.id)
                    .into_iter()
                    .map(|b| b.name.as_str())
                    .collect();
                if !boards.is_empty() {
                    println!("  boards: {}", boards.join(", "));
                }
                for comment in &pin.comments {
                    println!("  {}: {}", comment.username, comment.text);
                }
            }
        }
        Ok(())
    }

    fn run_board(&mut self, cmd: BoardCommand) -> Result<()> {
        let user = self.user()?;
        match cmd {
            BoardCommand::Create {
                name,
                description,
                secret,
            } => {
                let board = self.pins.add_board(NewBoard {
                    name,
                    description,
                    user_id: user.id,
                    is_secret: secret,
                    cover_image: None,
                })?;
                println!("Created board {} ({})", board.name, board.id);
            }
            BoardCommand::Delete { id } => {
                self.owned_board(&id, &user)?;
                self.pins.delete_board(&id)?;
                println!("Deleted board {id}");
            }
            BoardCommand::AddPin { board, pin } => {
                self.owned_board(&board, &user)?;
                if !self.pins.add_pin_to_board(&pin, &board)? {
                    bail!("No pin {pin}");
                }
                println!("Saved pin {pin} to board {board}");
            }
            BoardCommand::RemovePin { board, pin } => {
                self.owned_board(&board, &user)?;
                self.pins.remove_pin_from_board(&pin, &board)?;
                println!("Removed pin {pin} from board {board}");
            }
            BoardCommand::Show { id } => {
                let Some(board) = self.pins.board(&id) else {
                    bail!("No board {id}");
                };
                if board.is_secret && board.user_id != user.id {
                    bail!("No board {id}");
                }
                println!("{} ({} pins)", board.name, board.pin_ids.len());
                for pin in self.pins.board_pins(&id) {
                    print_pin_line(pin);
                }
            }
            BoardCommand::List => {
                for board in self.pins.boards_by_user(&user.id) {
                    let marker = if board.is_secret { " [secret]" } else { "" };
                    println!("{}  {}{} ({} pins)", board.id, board.name, marker, board.pin_ids.len());
                }
            }
        }
        Ok(())
    }

    fn user(&self) -> Result<User> {
        match self.auth.current_user() {
            Some(user) => Ok(user.clone()),
            None => bail!("Not signed in"),
        }
    }

    fn owned_board(&self, id: &str, user: &User) -> Result<()> {
        match self.pins.board(id) {
            None => bail!("No board {id}"),
            Some(board) if board.user_id != user.id => bail!("Board {id} belongs to someone else"),
            Some(_) => Ok(()),
        }
    }
}

fn print_pin_line(pin: &Pin) {
    let tags = if pin.tags.is_empty() {
        String::new()
    } else {
        format!(" #{}", pin.tags.join(" #"))
    };
    println!(
        "{}  {} by {} ({} likes, {} comments){}",
        pin.id,
        pin.title,
        pin.username,
        pin.likes,
        pin.comments.len(),
        tags
    );
}
