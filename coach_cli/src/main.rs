use chrono::{DateTime, NaiveDate, Utc};
use clap::{Parser, Subcommand, ValueEnum};
use coach_core::catalog::{self, MoveDirection};
use coach_core::credits::{self, NewPlan};
use coach_core::schedule::{self, DayPreview};
use coach_core::session::ExerciseBlock;
use coach_core::{clients, export, history, streak, weekly};
use coach_core::*;
use serde::Serialize;
use std::path::PathBuf;
use std::process::ExitCode;
use uuid::Uuid;

#[derive(Parser)]
#[command(name = "coach")]
#[command(about = "Personal training coach: schedules, sessions and credits", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Override data directory
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,

    /// Profile id to act as
    #[arg(long, global = true, env = "COACH_USER")]
    user: Option<Uuid>,

    /// Print results as JSON
    #[arg(long, global = true)]
    json: bool,

    /// Use this RFC 3339 instant instead of the system clock
    #[arg(long, global = true, env = "COACH_NOW", hide = true)]
    now: Option<DateTime<Utc>>,
}

#[derive(Clone, Copy, ValueEnum)]
enum RoleArg {
    Trainer,
    Client,
}

impl From<RoleArg> for Role {
    fn from(role: RoleArg) -> Self {
        match role {
            RoleArg::Trainer => Role::Trainer,
            RoleArg::Client => Role::Client,
        }
    }
}

#[derive(Clone, Copy, ValueEnum)]
enum DirectionArg {
    Up,
    Down,
}

#[derive(Subcommand)]
enum Commands {
    /// Create a profile
    Register {
        #[arg(long)]
        name: String,
        #[arg(long, value_enum)]
        role: RoleArg,
    },

    /// Show who --user resolves to
    Whoami,

    /// Author workouts (trainer)
    #[command(subcommand)]
    Workout(WorkoutCommand),

    /// Edit exercise entries (trainer)
    #[command(subcommand)]
    Exercise(ExerciseCommand),

    /// Manage client schedules (trainer)
    #[command(subcommand)]
    Schedule(ScheduleCommand),

    /// Manage session-credit plans (trainer)
    #[command(subcommand)]
    Plan(PlanCommand),

    /// Join a trainer (client)
    Join { trainer: Uuid },

    /// List your clients (trainer)
    Clients,

    /// A client's sessions and records (trainer)
    ClientProgress { client: Uuid },

    /// Dashboard counters (trainer)
    Stats,

    /// Today's sessions of your clients (trainer)
    Activity,

    /// Workouts you can start (client)
    Available,

    /// Your current plan (client)
    Subscription,

    /// Today's workout (client)
    Today,

    /// This week's plan (client)
    Week,

    /// Start or resume a workout (client)
    Start { workout: Uuid },

    /// Log a set (client)
    Log {
        session: Uuid,
        exercise: String,
        #[arg(long)]
        weight: f64,
        #[arg(long)]
        reps: u32,
        /// Set number; defaults to the next free one
        #[arg(long)]
        set: Option<u32>,
    },

    /// Delete a logged set (client)
    Unlog {
        session: Uuid,
        exercise: String,
        set: u32,
    },

    /// Finish a session (client)
    Finish {
        session: Uuid,
        /// Rate of perceived exertion, 1-10
        #[arg(long)]
        rpe: Option<u8>,
        #[arg(long)]
        notes: Option<String>,
    },

    /// Show a session
    Session { session: Uuid },

    /// Consecutive training days (client)
    Streak,

    /// Weekly goal and last four weeks (client)
    Progress,

    /// Personal records (client)
    Records {
        /// Show the record and per-date trend of one exercise
        #[arg(long)]
        exercise: Option<String>,
    },

    /// Recent completed sessions (client)
    History {
        #[arg(long)]
        limit: Option<usize>,
    },

    /// Recent sets of one exercise (client)
    ExerciseHistory {
        exercise: String,
        #[arg(long)]
        limit: Option<usize>,
    },

    /// Comment on a client's session (trainer)
    Feedback { session: Uuid, text: String },

    /// Export completed sets as CSV
    Export {
        /// Client to export; defaults to yourself
        #[arg(long)]
        client: Option<Uuid>,
        /// Output file; defaults to stdout
        #[arg(long)]
        output: Option<PathBuf>,
    },
}

#[derive(Subcommand)]
enum WorkoutCommand {
    Create {
        name: String,
        #[arg(long)]
        description: Option<String>,
    },
    List,
    Show {
        workout: Uuid,
    },
    /// Mark or unmark a workout as a template
    Template {
        workout: Uuid,
        #[arg(long)]
        off: bool,
    },
    Duplicate {
        workout: Uuid,
    },
    /// Exercise names used across your workouts
    Catalog,
}

#[derive(Subcommand)]
enum ExerciseCommand {
    Add {
        workout: Uuid,
        name: String,
        #[arg(long, default_value_t = 3)]
        sets: u32,
        #[arg(long, default_value = "10")]
        reps: String,
        #[arg(long, default_value_t = 90)]
        rest: u32,
        #[arg(long)]
        weight: Option<String>,
        #[arg(long)]
        video: Option<String>,
        #[arg(long)]
        image: Option<String>,
        #[arg(long)]
        superset: Option<u32>,
        #[arg(long)]
        notes: Option<String>,
    },
    Remove {
        entry: Uuid,
    },
    Move {
        entry: Uuid,
        #[arg(value_enum)]
        direction: DirectionArg,
    },
    /// Set the coaching note; empty text clears it
    Notes {
        entry: Uuid,
        text: String,
    },
}

#[derive(Subcommand)]
enum ScheduleCommand {
    Assign {
        #[arg(long)]
        client: Uuid,
        #[arg(long)]
        workout: Uuid,
        /// Every week on this day (0 = Sunday)
        #[arg(long, conflicts_with = "date", required_unless_present = "date")]
        day: Option<u8>,
        /// Once, on this date (YYYY-MM-DD)
        #[arg(long)]
        date: Option<NaiveDate>,
    },
    Remove {
        entry: Uuid,
    },
    /// A client's schedule; defaults to yourself
    Show {
        #[arg(long)]
        client: Option<Uuid>,
    },
}

#[derive(Subcommand)]
enum PlanCommand {
    Create {
        name: String,
        #[arg(long)]
        credits: u32,
        #[arg(long)]
        days: u32,
        #[arg(long, default_value_t = 0.0)]
        price: f64,
        #[arg(long)]
        description: Option<String>,
    },
    List,
    Archive {
        plan: Uuid,
    },
    Assign {
        plan: Uuid,
        #[arg(long)]
        client: Uuid,
    },
}

/// Everything a command needs
struct Ctx {
    store: FileStore,
    caller: Caller,
    config: Config,
    now: DateTime<Utc>,
    today: LocalDay,
    json: bool,
}

impl Ctx {
    /// Print as JSON or through the text renderer
    fn emit<T: Serialize>(&self, value: &T, text: impl FnOnce(&T)) -> Result<()> {
        if self.json {
            println!("{}", serde_json::to_string_pretty(value)?);
        } else {
            text(value);
        }
        Ok(())
    }
}

fn main() -> ExitCode {
    coach_core::logging::init_with_level("warn");

    let cli = Cli::parse();

    match into_action(run(cli)) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {}", e);
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<()> {
    let config = Config::load()?;
    let data_dir = cli.data_dir.unwrap_or_else(|| config.data.data_dir.clone());
    let store = FileStore::in_dir(&data_dir);

    let clock: Box<dyn Clock> = match cli.now {
        Some(instant) => Box::new(FixedClock(instant)),
        None => Box::new(SystemClock),
    };
    let now = clock.now();
    let today = LocalDay::from_offset_minutes(now, config.clock.utc_offset_minutes);
    let caller = identify(&store, cli.user)?;
    tracing::debug!("Acting as {:?} on {}", caller, today.date);

    let ctx = Ctx {
        store,
        caller,
        config,
        now,
        today,
        json: cli.json,
    };

    match cli.command {
        Commands::Register { name, role } => cmd_register(&ctx, &name, role.into()),
        Commands::Whoami => cmd_whoami(&ctx),
        Commands::Workout(cmd) => cmd_workout(&ctx, cmd),
        Commands::Exercise(cmd) => cmd_exercise(&ctx, cmd),
        Commands::Schedule(cmd) => cmd_schedule(&ctx, cmd),
        Commands::Plan(cmd) => cmd_plan(&ctx, cmd),
        Commands::Join { trainer } => cmd_join(&ctx, trainer),
        Commands::Clients => cmd_clients(&ctx),
        Commands::ClientProgress { client } => cmd_client_progress(&ctx, client),
        Commands::Stats => cmd_stats(&ctx),
        Commands::Activity => cmd_activity(&ctx),
        Commands::Available => cmd_available(&ctx),
        Commands::Subscription => cmd_subscription(&ctx),
        Commands::Today => cmd_today(&ctx),
        Commands::Week => cmd_week(&ctx),
        Commands::Start { workout } => cmd_start(&ctx, workout),
        Commands::Log {
            session,
            exercise,
            weight,
            reps,
            set,
        } => cmd_log(&ctx, session, &exercise, set, weight, reps),
        Commands::Unlog {
            session,
            exercise,
            set,
        } => cmd_unlog(&ctx, session, &exercise, set),
        Commands::Finish {
            session,
            rpe,
            notes,
        } => cmd_finish(&ctx, session, rpe, notes),
        Commands::Session { session } => cmd_session(&ctx, session),
        Commands::Streak => cmd_streak(&ctx),
        Commands::Progress => cmd_progress(&ctx),
        Commands::Records { exercise } => match exercise {
            Some(name) => cmd_exercise_trend(&ctx, &name),
            None => cmd_records(&ctx),
        },
        Commands::History { limit } => cmd_history(&ctx, limit),
        Commands::ExerciseHistory { exercise, limit } => {
            cmd_exercise_history(&ctx, &exercise, limit)
        }
        Commands::Feedback { session, text } => cmd_feedback(&ctx, session, &text),
        Commands::Export { client, output } => cmd_export(&ctx, client, output),
    }
}

// ----------------------------------------------------------------------------
// Profiles and links
// ----------------------------------------------------------------------------

fn cmd_register(ctx: &Ctx, name: &str, role: Role) -> Result<()> {
    let profile = register_profile(&ctx.store, name, role, ctx.now)?;
    ctx.emit(&profile, |p| {
        println!("✓ Registered {:?} {}", p.role, p.full_name);
        println!("  id: {}", p.id);
    })
}

fn cmd_whoami(ctx: &Ctx) -> Result<()> {
    let identity = ctx.caller.identity().copied();
    ctx.emit(&identity, |i| match i {
        Some(i) => println!("{} ({:?})", i.id, i.role),
        None => println!("anonymous"),
    })
}

fn cmd_join(ctx: &Ctx, trainer: Uuid) -> Result<()> {
    let link = clients::join_trainer(&ctx.store, &ctx.caller, trainer, ctx.now)?;
    ctx.emit(&link, |l| println!("✓ Joined trainer {}", l.trainer_id))
}

fn cmd_clients(ctx: &Ctx) -> Result<()> {
    let list = clients::list_clients(&ctx.store, &ctx.caller, ctx.now)?;
    ctx.emit(&list, |list| {
        if list.is_empty() {
            println!("No clients yet.");
        }
        for c in list {
            let last = c
                .last_workout_date
                .map(|d| d.to_string())
                .unwrap_or_else(|| "never".into());
            let credits = c
                .subscription
                .as_ref()
                .map(|s| format!("{}/{} credits", s.credits_remaining, s.credits_total))
                .unwrap_or_else(|| "no plan".into());
            println!(
                "{}  {}  {} sessions, last {}, {}",
                c.profile.id, c.profile.full_name, c.total_completed_workouts, last, credits
            );
        }
    })
}

fn cmd_stats(ctx: &Ctx) -> Result<()> {
    let stats = clients::trainer_stats(&ctx.store, &ctx.caller, ctx.today.date, ctx.now)?;
    ctx.emit(&stats, |stats| match stats {
        Some(s) => {
            println!("Sessions today:   {}", s.sessions_today);
            println!("Plans expiring:   {}", s.expiring_plans);
            println!("Active clients:   {}", s.active_clients);
        }
        None => println!("No stats available."),
    })
}

fn cmd_activity(ctx: &Ctx) -> Result<()> {
    let items = clients::today_activity(&ctx.store, &ctx.caller, ctx.today.date)?;
    ctx.emit(&items, |items| {
        if items.is_empty() {
            println!("No activity today.");
        }
        for item in items {
            let who = item.client_name.as_deref().unwrap_or("Unknown client");
            let state = match item.status {
                LogStatus::InProgress => "training",
                LogStatus::Completed => "done",
            };
            println!("{}  {}  {}", who, item.workout_name, state);
        }
    })
}

fn cmd_available(ctx: &Ctx) -> Result<()> {
    let workouts = clients::available_workouts(&ctx.store, &ctx.caller)?;
    ctx.emit(&workouts, |workouts| {
        if workouts.is_empty() {
            println!("No workouts available. Join a trainer first.");
        }
        for w in workouts {
            let by = w.trainer_name.as_deref().unwrap_or("unknown trainer");
            println!("{}  {}  (by {})", w.id, w.name, by);
        }
    })
}

// ----------------------------------------------------------------------------
// Workout authoring
// ----------------------------------------------------------------------------

fn cmd_workout(ctx: &Ctx, cmd: WorkoutCommand) -> Result<()> {
    match cmd {
        WorkoutCommand::Create { name, description } => {
            let workout = catalog::create_workout(&ctx.store, &ctx.caller, &name, description, ctx.now)?;
            ctx.emit(&workout, |w| {
                println!("✓ Created workout {}", w.name);
                println!("  id: {}", w.id);
            })
        }
        WorkoutCommand::List => {
            let workouts = catalog::list_workouts(&ctx.store, &ctx.caller)?;
            ctx.emit(&workouts, |workouts| {
                for w in workouts {
                    let marker = if w.is_template { " [template]" } else { "" };
                    println!("{}  {}{}", w.id, w.name, marker);
                }
            })
        }
        WorkoutCommand::Show { workout } => {
            let detail = catalog::get_workout(&ctx.store, &ctx.caller, workout)?
                .ok_or_else(|| Error::NotFound("workout".into()))?;
            ctx.emit(&detail, |d| {
                println!("{}", d.workout.name);
                if let Some(desc) = &d.workout.description {
                    println!("  {}", desc);
                }
                let entries: Vec<&ExerciseEntry> = d.entries.iter().collect();
                for e in &entries {
                    let group = e
                        .superset_group
                        .map(|g| format!(" [superset {}]", g))
                        .unwrap_or_default();
                    println!(
                        "  {}. {} {}x{} rest {}s{}  ({})",
                        e.order_index + 1,
                        e.exercise_name,
                        e.target_sets,
                        e.target_reps,
                        e.rest_seconds,
                        group,
                        e.id
                    );
                    if let Some(notes) = &e.trainer_notes {
                        println!("     note: {}", notes);
                    }
                }
                for problem in catalog::validate_workout(&d.workout, &entries) {
                    println!("  ! {}", problem);
                }
            })
        }
        WorkoutCommand::Template { workout, off } => {
            let w = catalog::set_template(&ctx.store, &ctx.caller, workout, !off)?;
            ctx.emit(&w, |w| {
                let state = if w.is_template { "is now" } else { "is no longer" };
                println!("✓ {} {} a template", w.name, state);
            })
        }
        WorkoutCommand::Duplicate { workout } => {
            let copy = catalog::duplicate_workout(&ctx.store, &ctx.caller, workout, ctx.now)?;
            ctx.emit(&copy, |w| {
                println!("✓ Created {}", w.name);
                println!("  id: {}", w.id);
            })
        }
        WorkoutCommand::Catalog => {
            let items = catalog::exercise_catalog(&ctx.store, &ctx.caller)?;
            ctx.emit(&items, |items| {
                for item in items {
                    match &item.video_url {
                        Some(url) => println!("{}  ({})", item.name, url),
                        None => println!("{}", item.name),
                    }
                }
            })
        }
    }
}

fn cmd_exercise(ctx: &Ctx, cmd: ExerciseCommand) -> Result<()> {
    match cmd {
        ExerciseCommand::Add {
            workout,
            name,
            sets,
            reps,
            rest,
            weight,
            video,
            image,
            superset,
            notes,
        } => {
            let new = NewExercise {
                exercise_name: name,
                target_sets: sets,
                target_reps: reps,
                rest_seconds: rest,
                target_weight: weight,
                video_url: video,
                image_url: image,
                superset_group: superset,
                trainer_notes: notes,
            };
            let entry = catalog::add_exercise(&ctx.store, &ctx.caller, workout, new)?;
            ctx.emit(&entry, |e| {
                println!("✓ Added {} at position {}", e.exercise_name, e.order_index + 1);
                println!("  id: {}", e.id);
            })
        }
        ExerciseCommand::Remove { entry } => {
            catalog::remove_exercise(&ctx.store, &ctx.caller, entry)?;
            ctx.emit(&entry, |_| println!("✓ Removed"))
        }
        ExerciseCommand::Move { entry, direction } => {
            let direction = match direction {
                DirectionArg::Up => MoveDirection::Up,
                DirectionArg::Down => MoveDirection::Down,
            };
            catalog::reorder_exercise(&ctx.store, &ctx.caller, entry, direction)?;
            ctx.emit(&entry, |_| println!("✓ Moved"))
        }
        ExerciseCommand::Notes { entry, text } => {
            let e = catalog::update_trainer_notes(&ctx.store, &ctx.caller, entry, &text)?;
            ctx.emit(&e, |e| match &e.trainer_notes {
                Some(n) => println!("✓ Note for {}: {}", e.exercise_name, n),
                None => println!("✓ Note for {} cleared", e.exercise_name),
            })
        }
    }
}

// ----------------------------------------------------------------------------
// Schedule
// ----------------------------------------------------------------------------

fn cmd_schedule(ctx: &Ctx, cmd: ScheduleCommand) -> Result<()> {
    match cmd {
        ScheduleCommand::Assign {
            client,
            workout,
            day,
            date,
        } => {
            let slot = match (day, date) {
                (_, Some(date)) => ScheduleSlot::SpecificDate { date },
                (Some(day_of_week), None) => ScheduleSlot::Recurring { day_of_week },
                (None, None) => {
                    return Err(Error::Validation("either --day or --date is required".into()))
                }
            };
            let entry =
                schedule::assign_schedule(&ctx.store, &ctx.caller, client, workout, slot, ctx.now)?;
            ctx.emit(&entry, |e| {
                println!("✓ Scheduled ({})", describe_slot(&e.slot));
                println!("  id: {}", e.id);
            })
        }
        ScheduleCommand::Remove { entry } => {
            schedule::remove_schedule(&ctx.store, &ctx.caller, entry)?;
            ctx.emit(&entry, |_| println!("✓ Removed"))
        }
        ScheduleCommand::Show { client } => {
            let client = client
                .or_else(|| ctx.caller.user_id())
                .ok_or(Error::Unauthorized)?;
            let items = schedule::client_schedule(&ctx.store, &ctx.caller, client)?;
            ctx.emit(&items, |items| {
                if items.is_empty() {
                    println!("Nothing scheduled.");
                }
                for item in items {
                    println!(
                        "{:<16} {}  ({})",
                        describe_slot(&item.entry.slot),
                        item.workout_name.as_deref().unwrap_or("?"),
                        item.entry.id
                    );
                }
            })
        }
    }
}

const DAY_NAMES: [&str; 7] = [
    "Sunday",
    "Monday",
    "Tuesday",
    "Wednesday",
    "Thursday",
    "Friday",
    "Saturday",
];

fn day_name(day_of_week: u8) -> &'static str {
    DAY_NAMES.get(day_of_week as usize).copied().unwrap_or("?")
}

fn describe_slot(slot: &ScheduleSlot) -> String {
    match slot {
        ScheduleSlot::Recurring { day_of_week } => format!("every {}", day_name(*day_of_week)),
        ScheduleSlot::SpecificDate { date } => format!("on {}", date),
    }
}

fn cmd_today(ctx: &Ctx) -> Result<()> {
    let today = resolve_today(&ctx.store, &ctx.caller, ctx.today)?;
    ctx.emit(&today, |today| match today {
        None => println!("Rest day. Nothing scheduled for {}.", ctx.today.date),
        Some(w) => {
            let label = match w.status {
                TodayStatus::InProgress { .. } => "In progress",
                TodayStatus::Completed { .. } => "Completed",
                TodayStatus::Scheduled => "Scheduled",
            };
            println!("{}: {}", label, w.workout.name);
            if let Some(desc) = &w.workout.description {
                println!("  {}", desc);
            }
            if let Some(trainer) = &w.workout.trainer_name {
                println!("  by {}", trainer);
            }
            match w.status.log_id() {
                Some(log_id) => println!("  session: {}", log_id),
                None => println!("  workout: {}", w.workout.id),
            }
        }
    })
}

fn cmd_week(ctx: &Ctx) -> Result<()> {
    let week = week_preview(&ctx.store, &ctx.caller, ctx.today)?;
    ctx.emit(&week, |week: &Vec<DayPreview>| {
        for day in week {
            let marker = if day.is_today { "*" } else { " " };
            let what = day
                .workout
                .as_ref()
                .map(|w| w.workout.name.as_str())
                .unwrap_or("rest");
            println!("{} {:<9} {}  {}", marker, day_name(day.day_of_week), day.date, what);
        }
    })
}

// ----------------------------------------------------------------------------
// Sessions
// ----------------------------------------------------------------------------

fn cmd_start(ctx: &Ctx, workout: Uuid) -> Result<()> {
    let outcome = start_session(&ctx.store, &ctx.caller, workout, ctx.today, ctx.now)?;
    ctx.emit(&outcome, |o| {
        match o {
            StartOutcome::Started(_) => println!("✓ Session started"),
            StartOutcome::Resumed(_) => println!("✓ Resuming session"),
        }
        println!("  session: {}", o.log().id);
    })
}

fn cmd_log(
    ctx: &Ctx,
    session: Uuid,
    exercise: &str,
    set: Option<u32>,
    weight: f64,
    reps: u32,
) -> Result<()> {
    let row = log_set(&ctx.store, &ctx.caller, session, exercise, set, weight, reps, ctx.now)?;
    ctx.emit(&row, |r| {
        println!(
            "✓ {} set {}: {} x {}",
            r.exercise_name, r.set_number, r.weight, r.reps
        )
    })
}

fn cmd_unlog(ctx: &Ctx, session: Uuid, exercise: &str, set: u32) -> Result<()> {
    delete_set(&ctx.store, &ctx.caller, session, exercise, set)?;
    ctx.emit(&set, |set| println!("✓ Deleted {} set {}", exercise, set))
}

fn cmd_finish(ctx: &Ctx, session: Uuid, rpe: Option<u8>, notes: Option<String>) -> Result<()> {
    let outcome = finish_session(&ctx.store, &ctx.caller, session, rpe, notes, ctx.now)?;
    ctx.emit(&outcome, |o| match o {
        FinishOutcome::Finished { charged, .. } => {
            println!("✓ Workout complete!");
            match charged {
                Some(sub) => println!(
                    "  Credits left: {}/{}",
                    sub.credits_remaining, sub.credits_total
                ),
                None => println!("  No active plan; session not charged"),
            }
        }
        FinishOutcome::AlreadyCompleted { .. } => println!("Session was already completed."),
    })
}

fn cmd_session(ctx: &Ctx, session: Uuid) -> Result<()> {
    let view = session_view(&ctx.store, &ctx.caller, session)?
        .ok_or_else(|| Error::NotFound("session".into()))?;
    ctx.emit(&view, |v| {
        let status = match v.log.status {
            LogStatus::InProgress => "in progress",
            LogStatus::Completed => "completed",
        };
        println!("{} ({}, {})", v.workout.name, v.log.date, status);

        for block in &v.blocks {
            if let ExerciseBlock::Superset { group, .. } = block {
                println!("  Superset {}", group);
            }
            for ex in block.exercises() {
                let check = if ex.complete { "x" } else { " " };
                println!(
                    "  [{}] {} {}x{}  ({}/{} sets)",
                    check,
                    ex.entry.exercise_name,
                    ex.entry.target_sets,
                    ex.entry.target_reps,
                    ex.sets.len(),
                    ex.entry.target_sets
                );
                for s in &ex.sets {
                    println!("       set {}: {} x {}", s.set_number, s.weight, s.reps);
                }
                if let Some(pr) = v.records.iter().find(|r| r.exercise_name == ex.entry.exercise_name) {
                    println!("       PR: {} ({})", pr.weight, pr.date);
                }
            }
        }

        if let Some(date) = v.previous_date {
            println!("  Last time ({}):", date);
            for s in &v.previous_sets {
                println!("    {} set {}: {} x {}", s.exercise_name, s.set_number, s.weight, s.reps);
            }
        }
        if let Some(feedback) = &v.log.trainer_feedback {
            println!("  Trainer: {}", feedback);
        }
    })
}

// ----------------------------------------------------------------------------
// Progress
// ----------------------------------------------------------------------------

fn cmd_streak(ctx: &Ctx) -> Result<()> {
    let s = streak::client_streak(&ctx.store, &ctx.caller, ctx.today)?;
    ctx.emit(&s, |s| {
        println!("Streak: {} day(s)", s.streak);
        println!("Training days: {}", s.total);
    })
}

fn cmd_progress(ctx: &Ctx) -> Result<()> {
    let (progress, buckets) = weekly::client_weekly(&ctx.store, &ctx.caller, ctx.today)?;

    #[derive(Serialize)]
    struct Report {
        this_week: WeeklyProgress,
        history: Vec<WeekBucket>,
    }
    let report = Report {
        this_week: progress,
        history: buckets,
    };

    ctx.emit(&report, |r| {
        let done = if r.this_week.goal_met() { " ✓" } else { "" };
        println!(
            "This week: {}/{} sessions{}",
            r.this_week.count, r.this_week.goal, done
        );
        for b in &r.history {
            println!("  {:<9} {:<6} {}", b.week, "#".repeat(b.count as usize), b.count);
        }
    })
}

fn cmd_records(ctx: &Ctx) -> Result<()> {
    let records = history::client_records(&ctx.store, &ctx.caller)?;
    ctx.emit(&records, |records| {
        if records.is_empty() {
            println!("No records yet.");
        }
        for r in records {
            println!("{:<20} {} x {}  ({})", r.exercise_name, r.weight, r.reps, r.date);
        }
    })
}

fn cmd_exercise_trend(ctx: &Ctx, exercise: &str) -> Result<()> {
    let trend = history::client_exercise_trend(
        &ctx.store,
        &ctx.caller,
        exercise,
        history::SeriesOrder::Chronological,
    )?;
    ctx.emit(&trend, |trend| match trend {
        Some(t) => {
            let r = &t.record;
            println!("{}: best {} x {} ({})", r.exercise_name, r.weight, r.reps, r.date);
            for point in &t.series {
                println!("  {}  {}", point.date, point.max_weight);
            }
        }
        None => println!("No sets logged for {}.", exercise),
    })
}

fn cmd_history(ctx: &Ctx, limit: Option<usize>) -> Result<()> {
    let limit = limit.unwrap_or(ctx.config.history.recent_sessions);
    let sessions = history::recent_sessions(&ctx.store, &ctx.caller, limit)?;
    ctx.emit(&sessions, |sessions| {
        if sessions.is_empty() {
            println!("No completed sessions yet.");
        }
        for s in sessions {
            let rpe = s.log.rpe.map(|r| format!(" RPE {}", r)).unwrap_or_default();
            println!(
                "{}  {}  {} sets{}",
                s.log.date,
                s.workout_name.as_deref().unwrap_or("?"),
                s.sets.len(),
                rpe
            );
            if let Some(feedback) = &s.log.trainer_feedback {
                println!("    Trainer: {}", feedback);
            }
        }
    })
}

fn cmd_exercise_history(ctx: &Ctx, exercise: &str, limit: Option<usize>) -> Result<()> {
    let limit = limit.unwrap_or(ctx.config.history.exercise_history_limit);
    let sessions = history::exercise_history(&ctx.store, &ctx.caller, exercise, limit)?;
    ctx.emit(&sessions, |sessions| {
        for s in sessions {
            println!("{}  {}", s.date, s.workout_name.as_deref().unwrap_or("?"));
            for set in &s.sets {
                println!("    set {}: {} x {}", set.set_number, set.weight, set.reps);
            }
        }
    })
}

fn cmd_client_progress(ctx: &Ctx, client: Uuid) -> Result<()> {
    let progress = history::client_progress(&ctx.store, &ctx.caller, client)?
        .ok_or_else(|| Error::NotFound("client".into()))?;
    ctx.emit(&progress, |p| {
        println!("{}", p.client.full_name);
        println!("Records:");
        for trend in &p.exercises {
            let series: Vec<String> = trend
                .series
                .iter()
                .map(|pt| format!("{}", pt.max_weight))
                .collect();
            println!(
                "  {:<20} {}  [{}]",
                trend.record.exercise_name,
                trend.record.weight,
                series.join(" ")
            );
        }
        println!("Sessions:");
        for s in &p.sessions {
            println!(
                "  {}  {}  ({})",
                s.log.date,
                s.workout_name.as_deref().unwrap_or("?"),
                s.log.id
            );
            if let Some(notes) = &s.log.notes {
                println!("    Client: {}", notes);
            }
            if let Some(feedback) = &s.log.trainer_feedback {
                println!("    You: {}", feedback);
            }
        }
    })
}

fn cmd_feedback(ctx: &Ctx, session: Uuid, text: &str) -> Result<()> {
    let log = history::save_trainer_feedback(&ctx.store, &ctx.caller, session, text)?;
    ctx.emit(&log, |l| match &l.trainer_feedback {
        Some(_) => println!("✓ Feedback saved"),
        None => println!("✓ Feedback cleared"),
    })
}

// ----------------------------------------------------------------------------
// Plans
// ----------------------------------------------------------------------------

fn cmd_plan(ctx: &Ctx, cmd: PlanCommand) -> Result<()> {
    match cmd {
        PlanCommand::Create {
            name,
            credits: session_credits,
            days,
            price,
            description,
        } => {
            let plan = credits::create_plan(
                &ctx.store,
                &ctx.caller,
                NewPlan {
                    name,
                    description,
                    session_credits,
                    validity_days: days,
                    price,
                },
                ctx.now,
            )?;
            ctx.emit(&plan, |p| {
                println!("✓ Created plan {}", p.name);
                println!("  id: {}", p.id);
            })
        }
        PlanCommand::List => {
            let plans = credits::list_plans(&ctx.store, &ctx.caller)?;
            ctx.emit(&plans, |plans| {
                for p in plans {
                    println!(
                        "{}  {}  {} sessions / {} days  {:.2}",
                        p.id, p.name, p.session_credits, p.validity_days, p.price
                    );
                }
            })
        }
        PlanCommand::Archive { plan } => {
            credits::archive_plan(&ctx.store, &ctx.caller, plan)?;
            ctx.emit(&plan, |_| println!("✓ Plan archived"))
        }
        PlanCommand::Assign { plan, client } => {
            let sub = credits::assign_plan(&ctx.store, &ctx.caller, client, plan, ctx.now)?;
            ctx.emit(&sub, |s| {
                println!("✓ Plan assigned: {} credits", s.credits_total);
                println!("  valid until {}", s.end_date.date_naive());
            })
        }
    }
}

fn cmd_subscription(ctx: &Ctx) -> Result<()> {
    let sub = credits::current_subscription(&ctx.store, &ctx.caller, ctx.now)?;
    ctx.emit(&sub, |sub| match sub {
        Some(s) => println!(
            "{}/{} credits, valid until {}",
            s.credits_remaining,
            s.credits_total,
            s.end_date.date_naive()
        ),
        None => println!("No active plan."),
    })
}

// ----------------------------------------------------------------------------
// Export
// ----------------------------------------------------------------------------

fn cmd_export(ctx: &Ctx, client: Option<Uuid>, output: Option<PathBuf>) -> Result<()> {
    let client = match client {
        Some(id) => id,
        None => ctx.caller.require()?,
    };

    match output {
        Some(path) => {
            let count = export::export_sets_to_path(&ctx.store, &ctx.caller, client, &path)?;
            eprintln!("✓ Exported {} sets to {}", count, path.display());
        }
        None => {
            export::export_sets(&ctx.store, &ctx.caller, client, std::io::stdout().lock())?;
        }
    }
    Ok(())
}
