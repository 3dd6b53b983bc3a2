//! Manual odds entry
//!
//! Prompts for a player's position and name, then the odds (and line) of every
//! market that position needs. Values outside the allowed ranges are
//! re-prompted rather than rejected.

use async_trait::async_trait;
use std::io::{BufRead, Write};
use tokio::sync::{mpsc, watch};

use super::{QuoteEvent, QuoteSource, SourceReport};
use crate::error::{validate_line, validate_odds, Error, Result};
use crate::models::{MarketQuote, MarketType, Player, Position};

/// Line-oriented user interaction
pub trait Prompter: Send {
    /// Read one line of text
    fn text(&mut self, prompt: &str) -> Result<String>;

    /// Read a number, asking again until the input parses
    fn number(&mut self, prompt: &str) -> Result<f64>;

    /// Yes/no question
    fn confirm(&mut self, prompt: &str) -> Result<bool>;

    fn warn(&mut self, message: &str);
}

/// Prompter over any reader/writer pair (stdin/stdout in practice)
pub struct LinePrompter<R, W> {
    input: R,
    output: W,
}

impl<R: BufRead + Send, W: Write + Send> LinePrompter<R, W> {
    pub fn new(input: R, output: W) -> Self {
        Self { input, output }
    }

    fn read_line(&mut self, prompt: &str) -> Result<String> {
        write!(self.output, "{}: ", prompt)?;
        self.output.flush()?;

        let mut line = String::new();
        if self.input.read_line(&mut line)? == 0 {
            return Err(Error::Io(std::io::Error::new(
                std::io::ErrorKind::UnexpectedEof,
                "input closed",
            )));
        }
        Ok(line.trim().to_string())
    }
}

impl<R: BufRead + Send, W: Write + Send> Prompter for LinePrompter<R, W> {
    fn text(&mut self, prompt: &str) -> Result<String> {
        self.read_line(prompt)
    }

    fn number(&mut self, prompt: &str) -> Result<f64> {
        loop {
            let answer = self.read_line(prompt)?;
            match answer.parse::<f64>() {
                Ok(value) => return Ok(value),
                Err(_) => self.warn(&format!("{:?} is not a number", answer)),
            }
        }
    }

    fn confirm(&mut self, prompt: &str) -> Result<bool> {
        let answer = self.read_line(&format!("{} [y/N]", prompt))?;
        Ok(matches!(answer.to_ascii_lowercase().as_str(), "y" | "yes"))
    }

    fn warn(&mut self, message: &str) {
        let _ = writeln!(self.output, "{}", message);
    }
}

/// Quote source fed by a person at a terminal
pub struct ManualEntrySource<P> {
    prompter: P,
    /// Ask for another player after each one
    repeat: bool,
}

impl<P: Prompter> ManualEntrySource<P> {
    pub fn new(prompter: P) -> Self {
        Self {
            prompter,
            repeat: true,
        }
    }

    /// Enter exactly one player
    pub fn single(prompter: P) -> Self {
        Self {
            prompter,
            repeat: false,
        }
    }

    fn position(&mut self) -> Result<Position> {
        loop {
            let answer = self.prompter.text("Enter position (QB, RB, WR, TE)")?;
            match answer.parse::<Position>() {
                Ok(position) => return Ok(position),
                Err(e) => self.prompter.warn(&e.to_string()),
            }
        }
    }

    fn odds(&mut self, prompt: &str) -> Result<f64> {
        loop {
            let value = self.prompter.number(prompt)?;
            match validate_odds(value) {
                Ok(odds) => return Ok(odds),
                Err(e) => self.prompter.warn(&e.to_string()),
            }
        }
    }

    fn line(&mut self, market: MarketType) -> Result<f64> {
        let prompt = format!("Enter the {} line", market.label());
        loop {
            let value = self.prompter.number(&prompt)?;
            match validate_line(market, value) {
                Ok(line) => return Ok(line),
                Err(e) => self.prompter.warn(&e.to_string()),
            }
        }
    }

    fn quote(&mut self, market: MarketType) -> Result<MarketQuote> {
        if market.is_binary() {
            let yes = self.odds("Enter odds for Anytime Touchdown Yes")?;
            let no = self.odds("Enter odds for Anytime Touchdown No")?;
            return MarketQuote::binary(market, yes, no);
        }

        let over = self.odds(&format!("Enter the odds for Over {}", market.label()))?;
        let under = self.odds(&format!("Enter the odds for Under {}", market.label()))?;
        let line = self.line(market)?;
        MarketQuote::over_under(market, over, under, line)
    }

    /// Prompt for one complete player
    fn player(&mut self) -> Result<Vec<QuoteEvent>> {
        let position = self.position()?;
        let name = loop {
            let name = self.prompter.text("Enter player name")?;
            if !name.is_empty() {
                break name;
            }
            self.prompter.warn("Player name cannot be empty");
        };

        let player = Player::new(name).with_position(position);
        let mut events = Vec::with_capacity(position.required_markets().len());
        for &market in position.required_markets() {
            events.push((player.clone(), self.quote(market)?));
        }
        Ok(events)
    }
}

#[async_trait]
impl<P: Prompter> QuoteSource for ManualEntrySource<P> {
    fn name(&self) -> &'static str {
        "manual"
    }

    /// Prompt player by player until the user stops
    ///
    /// After each player the source waits for the receiver to take every
    /// quote, so the player's projection is out before the next prompt. The
    /// receiver must be polled concurrently with this future.
    async fn run(
        &mut self,
        sink: mpsc::Sender<QuoteEvent>,
        cancel: watch::Receiver<bool>,
    ) -> Result<SourceReport> {
        let mut report = SourceReport::default();

        loop {
            let stop = *cancel.borrow();
            if stop {
                report.cancelled = true;
                break;
            }

            let events = self.player()?;
            for event in events {
                sink.send(event).await.map_err(|_| Error::Cancelled)?;
                report.quotes_emitted += 1;
            }
            drained(&sink).await;

            let stop = *cancel.borrow();
            if stop {
                report.cancelled = true;
                break;
            }

            if !self.repeat || !self.prompter.confirm("Enter another player?")? {
                break;
            }
        }

        Ok(report)
    }
}

/// Yield until the receiver has taken every queued event (or is gone)
async fn drained(sink: &mpsc::Sender<QuoteEvent>) {
    while !sink.is_closed() && sink.capacity() < sink.max_capacity() {
        tokio::task::yield_now().await;
    }
}
