use ratatui::style::Color;

pub const BREAK_LABEL: &str = "BREAK";

pub const DEFAULT_TASK_LABEL: &str = "Untitled Task";

pub const TIME_SETTINGS: TimeSettings = TimeSettings {
    tick_ms: 1000,
    poll_ms: 50,
};

pub const STORE_KEYS: StoreKeys = StoreKeys {
    daily_tasks_prefix: "daily-tasks-",
    break_time_prefix: "break-time-",
    overall_tasks: "overallTasks",
    running_state: "runningState",
};

pub const FILE_PATHS: FilePaths = FilePaths {
    local_data_dir: "./.daytimer",
    config: "config.json",
    log: "daytimer.log",
};

pub const DATE_FORMAT: &str = "%Y-%m-%d";

pub const STATE_COLORS: StateColors = StateColors {
    idle: Color::Gray,
    running: Color::Rgb(0, 176, 80),
    paused: Color::Rgb(255, 204, 0),
    on_break: Color::Rgb(0, 153, 255),
};

pub struct TimeSettings {
    pub tick_ms: u64,
    pub poll_ms: u64,
}

pub struct StoreKeys {
    pub daily_tasks_prefix: &'static str,
    pub break_time_prefix: &'static str,
    pub overall_tasks: &'static str,
    pub running_state: &'static str,
}

impl StoreKeys {
    pub fn daily_tasks(&self, date: &str) -> String {
        format!("{}{}", self.daily_tasks_prefix, date)
    }

    pub fn break_time(&self, date: &str) -> String {
        format!("{}{}", self.break_time_prefix, date)
    }
}

pub struct FilePaths {
    pub local_data_dir: &'static str,
    pub config: &'static str,
    pub log: &'static str,
}

pub struct StateColors {
    pub idle: Color,
    pub running: Color,
    pub paused: Color,
    pub on_break: Color,
}
