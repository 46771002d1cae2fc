//! Singapore weather: rain map, nowcast and forecasts

use anyhow::Result;
use async_trait::async_trait;
use teloxide::types::{
    ButtonRequest, InlineKeyboardButton, InlineKeyboardMarkup, KeyboardButton, KeyboardMarkup, ReplyMarkup,
};
use teloxide::utils::html;
use tracing::warn;

use super::{Module, Reply, Request};
use crate::bot::ui_builder::{button_column, refresh_keyboard, timestamp, Responder};
use crate::directive::Media;
use crate::localization::{t, t_args};

pub mod api;
pub mod rainmap;
pub mod render;

use api::{WeatherApi, WeatherError};

const KEY: &str = "/weathersg";
const NEAREST_AREAS: usize = 5;
const SUGGESTIONS: usize = 10;

#[derive(Debug, PartialEq, Eq)]
enum Action {
    Menu,
    Help,
    Rainmap,
    Forecast2h,
    Forecast24h,
    Forecast4d,
    Unknown,
}

impl Action {
    fn parse(arg: Option<&str>) -> Self {
        match arg.map(str::to_lowercase).as_deref() {
            None => Action::Menu,
            Some("help") => Action::Help,
            Some("rainmap") => Action::Rainmap,
            Some("forecast2h") => Action::Forecast2h,
            Some("forecast24h") => Action::Forecast24h,
            Some("forecast4d") => Action::Forecast4d,
            Some(_) => Action::Unknown,
        }
    }
}

/// Regions of the 24 hour forecast
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Region {
    North,
    South,
    East,
    West,
    Central,
}

impl Region {
    const ALL: [Region; 5] = [Region::North, Region::South, Region::East, Region::West, Region::Central];

    fn parse(arg: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|r| r.as_str() == arg)
    }

    fn as_str(self) -> &'static str {
        match self {
            Region::North => "north",
            Region::South => "south",
            Region::East => "east",
            Region::West => "west",
            Region::Central => "central",
        }
    }

    fn button(self) -> InlineKeyboardButton {
        InlineKeyboardButton::callback(
            t(&format!("weather-region-{}", self.as_str())),
            format!("{KEY} forecast24h {}", self.as_str()),
        )
    }
}

/// Parse `gps=lat,long`
fn parse_gps(arg: &str) -> Result<(f64, f64), String> {
    let coords = arg.trim_start_matches("gps=");
    let (latitude, longitude) = coords
        .split_once(',')
        .ok_or_else(|| format!("expected gps=LAT,LONG, got '{arg}'"))?;
    let parse = |v: &str| v.trim().parse::<f64>().map_err(|e| format!("'{v}': {e}"));
    Ok((parse(latitude)?, parse(longitude)?))
}

fn api_error(responder: &Responder, error: &WeatherError) -> Reply {
    warn!(error = %error, "Weather API request failed");
    let text = t_args("weather-api-error", &[("detail", &error.to_string())]);
    Reply::one(responder.exception(&html::escape(&text)))
}

/// Append the refresh time when the reply edits an older message
fn stamp_if_editing(responder: &Responder, mut text: String) -> String {
    if responder.is_editing() {
        text.push('\n');
        text.push_str(&t_args("ui-timestamp", &[("timestamp", &timestamp())]));
    }
    text
}

pub struct WeatherModule {
    api: WeatherApi,
}

impl WeatherModule {
    pub fn new(http: reqwest::Client) -> Self {
        Self {
            api: WeatherApi::new(http),
        }
    }

    fn menu(request: &Request<'_>) -> Reply {
        let keyboard = button_column([
            (t("weather-menu-rainmap"), format!("{KEY} rainmap")),
            (t("weather-menu-forecast2h"), format!("{KEY} forecast2h")),
            (t("weather-menu-forecast24h"), format!("{KEY} forecast24h")),
            (t("weather-menu-forecast4d"), format!("{KEY} forecast4d")),
            (t("weather-menu-help"), format!("{KEY} help")),
        ]);
        Reply::one(request.responder().menu(&t("ui-select-option"), keyboard))
    }

    /// Ask for an area name, or a location in private chats
    fn ask_for_location(request: &Request<'_>) -> Reply {
        let responder = request.responder();

        let directive = if request.update.is_in_group() {
            responder.text(&t("weather-enter-region"), None)
        } else {
            let keyboard = KeyboardMarkup::new(vec![vec![
                KeyboardButton::new(t("weather-send-location")).request(ButtonRequest::Location),
            ]])
            .one_time_keyboard();
            responder.text(&t("weather-enter-region-or-location"), Some(ReplyMarkup::Keyboard(keyboard)))
        };

        Reply::one(directive).listening(request.args)
    }

    async fn forecast_2h(&self, request: &Request<'_>) -> Result<Reply> {
        let base = request.head(2);
        let chosen_area = (request.argc() > 2).then(|| request.args[2..].join(" ").to_lowercase());
        let mut location = request.update.location();

        if location.is_none() && chosen_area.is_none() {
            return Ok(Self::ask_for_location(request));
        }

        if let Some(area) = chosen_area.as_deref().filter(|a| a.contains("gps=")) {
            match parse_gps(area) {
                Ok(coords) => location = Some(coords),
                Err(detail) => {
                    let text = t_args("weather-invalid-gps", &[("detail", &detail)]);
                    return Ok(Reply::one(request.responder().exception(&html::escape(&text))));
                }
            }
        }

        let forecast = match self.api.forecast_2h().await {
            Ok(forecast) => forecast,
            Err(e) => return Ok(api_error(&request.responder(), &e)),
        };

        let coords = location.or_else(|| {
            let area = chosen_area.as_deref()?;
            forecast
                .areas
                .iter()
                .find(|a| a.name.to_lowercase() == area)
                .map(|a| (a.label_location.latitude, a.label_location.longitude))
        });

        let Some((latitude, longitude)) = coords else {
            let area = chosen_area.unwrap_or_default();
            let suggestions = render::closest_names(&area, forecast.areas.iter().map(|a| a.name.as_str()), SUGGESTIONS)
                .into_iter()
                .map(|name| format!("- <pre>{}</pre>", html::escape(name)))
                .collect::<Vec<_>>()
                .join("\n");
            let text = t_args(
                "weather-unknown-region",
                &[("region", &html::escape(&area)), ("suggestions", &suggestions)],
            );
            let responder = request.responder().with_args(base);
            return Ok(Reply::one(responder.text(&text, None)).listening(base));
        };

        let mut args = base.to_vec();
        args.push(format!("gps={latitude},{longitude}"));
        let responder = request.responder().with_args(&args);

        let selected = render::nearest_areas(&forecast.areas, latitude, longitude, NEAREST_AREAS);
        let text = stamp_if_editing(&responder, render::render_forecast_2h(&forecast, &selected));
        Ok(Reply::one(responder.menu(&text, refresh_keyboard(&args))))
    }

    async fn forecast_24h(&self, request: &Request<'_>) -> Result<Reply> {
        let args: Vec<String> = request.args.iter().map(|a| a.to_lowercase()).collect();
        let responder = Responder::new(request.chat_id(), request.update.reply_target(), &args);

        match args.len() {
            2 => {
                let keyboard = InlineKeyboardMarkup::new(vec![
                    vec![Region::North.button()],
                    vec![Region::West.button(), Region::Central.button(), Region::East.button()],
                    vec![Region::South.button()],
                ]);
                Ok(Reply::one(responder.menu(&t("ui-select-option"), keyboard)))
            }
            3 => {
                let Some(region) = Region::parse(&args[2]) else {
                    let options = Region::ALL.map(Region::as_str).join(", ");
                    let text = t_args(
                        "weather-invalid-region",
                        &[("region", &html::escape(&args[2])), ("options", options.as_str())],
                    );
                    return Ok(Reply::one(responder.exception(&text)));
                };

                let forecast = match self.api.forecast_24h().await {
                    Ok(forecast) => forecast,
                    Err(e) => return Ok(api_error(&responder, &e)),
                };

                let text = stamp_if_editing(&responder, render::render_forecast_24h(&forecast, region.as_str()));
                Ok(Reply::one(responder.menu(&text, refresh_keyboard(&args))))
            }
            count => {
                let text = t_args("weather-too-many-args", &[("count", &count.to_string())]);
                Ok(Reply::one(responder.exception(&text)))
            }
        }
    }

    async fn forecast_4d(&self, request: &Request<'_>) -> Result<Reply> {
        let responder = request.responder();
        let forecast = match self.api.forecast_4d().await {
            Ok(forecast) => forecast,
            Err(e) => return Ok(api_error(&responder, &e)),
        };

        let text = stamp_if_editing(&responder, render::render_forecast_4d(&forecast));
        Ok(Reply::one(responder.menu(&text, refresh_keyboard(request.args))))
    }

    async fn rainmap(&self, request: &Request<'_>) -> Result<Reply> {
        let rainmap = match self.api.rainmap().await {
            Ok(rainmap) => rainmap,
            Err(e) => return Ok(api_error(&request.responder(), &e)),
        };

        // Only a photo message can have its media replaced
        let responder = if request.update.is_callback_on_photo() {
            request.responder()
        } else {
            request.responder().sending()
        };

        let mut caption = t_args(
            "weather-updated",
            &[("timestamp", &rainmap.time.format("%Y-%m-%d %H:%M").to_string())],
        );
        if responder.is_editing() {
            caption.push_str("\n\n");
            caption.push_str(&t_args("ui-timestamp", &[("timestamp", &timestamp())]));
        }

        let photo = Media::Bytes {
            data: rainmap.png.to_vec(),
            file_name: "rainmap.png".to_string(),
        };
        let keyboard = refresh_keyboard(request.head(2));
        Ok(Reply::one(responder.photo(photo, Some(caption), Some(keyboard))))
    }
}

#[async_trait]
impl Module for WeatherModule {
    fn key(&self) -> &str {
        KEY
    }

    fn description(&self) -> &str {
        "Get the latest Singapore Weather"
    }

    async fn handle(&self, request: &Request<'_>) -> Result<Reply> {
        match Action::parse(request.arg(1)) {
            Action::Menu => Ok(Self::menu(request)),
            Action::Help => {
                let text = t_args("weather-help", &[("key", KEY)]);
                Ok(Reply::one(request.responder().text(&text, None)))
            }
            Action::Rainmap => self.rainmap(request).await,
            Action::Forecast2h => self.forecast_2h(request).await,
            Action::Forecast24h => self.forecast_24h(request).await,
            Action::Forecast4d => self.forecast_4d(request).await,
            Action::Unknown => {
                let text = t_args(
                    "weather-invalid-arguments",
                    &[("arguments", &html::escape(&request.args[1..].join(" ")))],
                );
                Ok(Reply::one(request.responder().exception(&text)))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_action_parse() {
        assert_eq!(Action::parse(None), Action::Menu);
        assert_eq!(Action::parse(Some("RainMap")), Action::Rainmap);
        assert_eq!(Action::parse(Some("forecast2h")), Action::Forecast2h);
        assert_eq!(Action::parse(Some("tomorrow")), Action::Unknown);
    }

    #[test]
    fn test_region_parse() {
        assert_eq!(Region::parse("north"), Some(Region::North));
        assert_eq!(Region::parse("central"), Some(Region::Central));
        assert_eq!(Region::parse("northeast"), None);
    }

    #[test]
    fn test_parse_gps() {
        assert_eq!(parse_gps("gps=1.35,103.84"), Ok((1.35, 103.84)));
        assert!(parse_gps("gps=1.35").is_err());
        assert!(parse_gps("gps=abc,103").is_err());
    }
}
