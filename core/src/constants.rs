// Table geometry and match rules.
// The browser client draws with the same numbers, so changing any of these
// changes what players see.

/// Table width (distance units)
pub const WIDTH: i32 = 800;

/// Table height (distance units)
pub const HEIGHT: i32 = 500;

/// Paddle height (distance units)
pub const PADDLE_HEIGHT: i32 = 60;

/// Highest paddle top a player can reach (HEIGHT - PADDLE_HEIGHT)
pub const PADDLE_MAX_Y: i32 = HEIGHT - PADDLE_HEIGHT;

/// Vertical distance a single move intent covers
pub const MOVE_STEP: i32 = 10;

/// Paddle top at match start, both slots
pub const PADDLE_START_Y: i32 = 200;

/// Horizontal position of slot 1's paddle
pub const LEFT_PADDLE_X: i32 = 90;

/// Horizontal position of slot 2's paddle
pub const RIGHT_PADDLE_X: i32 = 690;

/// Ball x below which slot 1's paddle can return it
pub const LEFT_HIT_X: i32 = 110;

/// Ball x above which slot 2's paddle can return it
pub const RIGHT_HIT_X: i32 = 690;

/// Ball y below which it bounces off the top wall
pub const WALL_TOP: i32 = 5;

/// Ball y above which it bounces off the bottom wall
pub const WALL_BOTTOM: i32 = 490;

/// Ball x below which slot 2 scores
pub const GOAL_LEFT: i32 = 5;

/// Ball x above which slot 1 scores
pub const GOAL_RIGHT: i32 = 795;

/// Ball reset position (x)
pub const BALL_CENTER_X: i32 = 395;

/// Ball reset position (y)
pub const BALL_CENTER_Y: i32 = 245;

/// Distance the ball covers per tick along each axis
pub const BALL_SPEED: i32 = 5;

/// Simulation ticks per second
pub const TICK_RATE_HZ: u32 = 60;

/// Points needed to win a match
pub const WIN_SCORE: u32 = 10;

/// Pause between both players staking and the first tick (milliseconds)
pub const ANNOUNCE_DELAY_MS: u64 = 3000;
