//! Per-tick ball and paddle simulation.
//!
//! [`advance`] is a pure transition: it takes the court as it stands and
//! returns the court one tick later, together with whatever scoring happened.
//! Integer arithmetic only, so a match replays identically everywhere.
//!
//! Order within a tick is fixed: move, paddle hits, wall bounce, goals.
//! Paddle and wall checks are independent, so a ball that meets a paddle
//! next to a wall takes both effects in the same tick.

use core::cmp::Ordering;

use serde::{Deserialize, Serialize};

use crate::constants::*;
use crate::types::Slot;

/// Horizontal direction of a serve
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Serve {
    Left,
    Right,
}

impl Serve {
    fn dx(self) -> i32 {
        match self {
            Serve::Left => -1,
            Serve::Right => 1,
        }
    }
}

/// Ball position and unit velocity. `dx` is always -1 or +1; `dy` is -1, 0 or +1.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Ball {
    pub x: i32,
    pub y: i32,
    pub dx: i32,
    pub dy: i32,
}

impl Ball {
    /// Ball at table center, travelling flat in the serve direction.
    pub fn serve(toward: Serve) -> Self {
        Self {
            x: BALL_CENTER_X,
            y: BALL_CENTER_Y,
            dx: toward.dx(),
            dy: 0,
        }
    }
}

/// Everything the simulation reads and writes in one tick.
/// Indexed by [`Slot::index`]: slot 1's paddle is on the left.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Court {
    pub ball: Ball,
    pub paddles: [i32; 2],
    pub scores: [u32; 2],
}

/// Result of one tick
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Step {
    pub court: Court,
    /// Slot that won a point this tick, if any
    pub scored: Option<Slot>,
    /// Set on the tick a slot first reaches the win score
    pub winner: Option<Slot>,
}

fn within_paddle(ball_y: i32, paddle_y: i32) -> bool {
    ball_y > paddle_y && ball_y < paddle_y + PADDLE_HEIGHT
}

// Three-way deflection: above the paddle midpoint goes up, below goes down,
// dead center returns flat.
fn deflect(ball_y: i32, paddle_y: i32) -> i32 {
    match ball_y.cmp(&(paddle_y + PADDLE_HEIGHT / 2)) {
        Ordering::Less => -1,
        Ordering::Greater => 1,
        Ordering::Equal => 0,
    }
}

/// Advance the court by one fixed tick.
pub fn advance(court: Court, win_score: u32) -> Step {
    let mut court = court;
    let ball = &mut court.ball;

    ball.x += ball.dx * BALL_SPEED;
    ball.y += ball.dy * BALL_SPEED;

    let [left, right] = court.paddles;
    if ball.x < LEFT_HIT_X && within_paddle(ball.y, left) {
        ball.dx = 1;
        ball.dy = deflect(ball.y, left);
    }
    if ball.x > RIGHT_HIT_X && within_paddle(ball.y, right) {
        ball.dx = -1;
        ball.dy = deflect(ball.y, right);
    }

    if ball.y < WALL_TOP || ball.y > WALL_BOTTOM {
        ball.dy = -ball.dy;
        ball.y = ball.y.clamp(0, HEIGHT);
    }

    let scored = if ball.x < GOAL_LEFT {
        *ball = Ball::serve(Serve::Right);
        Some(Slot::Two)
    } else if ball.x > GOAL_RIGHT {
        *ball = Ball::serve(Serve::Left);
        Some(Slot::One)
    } else {
        None
    };

    if let Some(slot) = scored {
        court.scores[slot.index()] += 1;
    }
    let winner = scored.filter(|slot| court.scores[slot.index()] >= win_score);

    Step {
        court,
        scored,
        winner,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn court(x: i32, y: i32, dx: i32, dy: i32) -> Court {
        Court {
            ball: Ball { x, y, dx, dy },
            paddles: [PADDLE_START_Y, PADDLE_START_Y],
            scores: [0, 0],
        }
    }

    #[test]
    fn ball_moves_five_units_per_axis() {
        let step = advance(court(400, 300, 1, -1), WIN_SCORE);
        assert_eq!((step.court.ball.x, step.court.ball.y), (405, 295));
        assert_eq!(step.scored, None);
    }

    #[test]
    fn left_goal_scores_for_slot_two_and_recenters() {
        let step = advance(court(8, 100, -1, 0), WIN_SCORE);
        assert_eq!(step.scored, Some(Slot::Two));
        assert_eq!(step.court.scores, [0, 1]);
        assert_eq!(
            step.court.ball,
            Ball {
                x: 395,
                y: 245,
                dx: 1,
                dy: 0
            }
        );
    }

    #[test]
    fn right_goal_scores_for_slot_one_and_serves_left() {
        let step = advance(court(792, 100, 1, 0), WIN_SCORE);
        assert_eq!(step.scored, Some(Slot::One));
        assert_eq!(step.court.scores, [1, 0]);
        assert_eq!(step.court.ball, Ball::serve(Serve::Left));
    }

    #[test]
    fn left_paddle_deflects_three_ways() {
        // Paddle spans 200..260, midpoint 230.
        let above = advance(court(114, 215, -1, 0), WIN_SCORE).court.ball;
        assert_eq!((above.dx, above.dy), (1, -1));

        let center = advance(court(114, 230, -1, 0), WIN_SCORE).court.ball;
        assert_eq!((center.dx, center.dy), (1, 0));

        let below = advance(court(114, 250, -1, 0), WIN_SCORE).court.ball;
        assert_eq!((below.dx, below.dy), (1, 1));
    }

    #[test]
    fn right_paddle_returns_ball() {
        let ball = advance(court(686, 245, 1, 0), WIN_SCORE).court.ball;
        assert_eq!((ball.x, ball.dx, ball.dy), (691, -1, 1));
    }

    #[test]
    fn paddle_edges_are_exclusive() {
        let ball = advance(court(114, 200, -1, 0), WIN_SCORE).court.ball;
        assert_eq!(ball.dx, -1);
        let ball = advance(court(114, 260, -1, 0), WIN_SCORE).court.ball;
        assert_eq!(ball.dx, -1);
    }

    #[test]
    fn walls_reverse_vertical_velocity() {
        let top = advance(court(400, 7, 1, -1), WIN_SCORE).court.ball;
        assert_eq!((top.y, top.dy), (2, 1));

        let bottom = advance(court(400, 488, 1, 1), WIN_SCORE).court.ball;
        assert_eq!((bottom.y, bottom.dy), (493, -1));
    }

    #[test]
    fn paddle_hit_and_wall_bounce_apply_in_same_tick() {
        let mut c = court(114, 7, -1, -1);
        c.paddles[0] = 0;
        let ball = advance(c, WIN_SCORE).court.ball;
        // Paddle sends it up-and-right, the wall then flips it down.
        assert_eq!((ball.dx, ball.dy), (1, 1));
    }

    #[test]
    fn winner_reported_only_on_reaching_win_score() {
        let mut c = court(792, 100, 1, 0);
        c.scores = [8, 9];
        let step = advance(c, WIN_SCORE);
        assert_eq!(step.court.scores, [9, 9]);
        assert_eq!(step.winner, None);

        let mut c = court(792, 100, 1, 0);
        c.scores = [9, 9];
        let step = advance(c, WIN_SCORE);
        assert_eq!(step.winner, Some(Slot::One));
    }
}
