// Utility slash commands: weather lookups and reminders.

use crate::discord::{Context, Error};
use poise::serenity_prelude::{self as serenity, Mentionable};
use serde::Deserialize;
use std::time::Duration;

#[derive(Debug, Deserialize)]
struct GeocodingResponse {
    results: Option<Vec<GeocodingResult>>,
}

#[derive(Debug, Deserialize)]
struct GeocodingResult {
    name: String,
    latitude: f64,
    longitude: f64,
    country: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ForecastResponse {
    current: CurrentWeather,
}

#[derive(Debug, Deserialize)]
struct CurrentWeather {
    temperature_2m: f64,
    wind_speed_10m: f64,
    weather_code: u32,
}

/// WMO weather interpretation codes, coarse-grained.
fn describe_weather(code: u32) -> &'static str {
    match code {
        0 => "Clear sky",
        1..=3 => "Partly cloudy",
        45 | 48 => "Fog",
        51..=57 => "Drizzle",
        61..=67 => "Rain",
        71..=77 => "Snow",
        80..=82 => "Rain showers",
        85 | 86 => "Snow showers",
        95..=99 => "Thunderstorm",
        _ => "Unknown conditions",
    }
}

/// Look up current weather for a city (Open-Meteo, no API key needed).
#[poise::command(slash_command)]
pub async fn weather(
    ctx: Context<'_>,
    #[description = "City to look up"] city: String,
) -> Result<(), Error> {
    ctx.defer().await?;

    let client = reqwest::Client::new();

    let geo: GeocodingResponse = client
        .get("https://geocoding-api.open-meteo.com/v1/search")
        .query(&[("name", city.as_str()), ("count", "1")])
        .send()
        .await?
        .error_for_status()?
        .json()
        .await?;

    let Some(place) = geo.results.and_then(|mut r| r.pop()) else {
        ctx.say(format!("Couldn't find a place called **{city}**."))
            .await?;
        return Ok(());
    };

    let forecast: ForecastResponse = client
        .get("https://api.open-meteo.com/v1/forecast")
        .query(&[
            ("latitude", place.latitude.to_string()),
            ("longitude", place.longitude.to_string()),
            (
                "current",
                "temperature_2m,wind_speed_10m,weather_code".to_string(),
            ),
        ])
        .send()
        .await?
        .error_for_status()?
        .json()
        .await?;

    let location = match &place.country {
        Some(country) => format!("{}, {}", place.name, country),
        None => place.name.clone(),
    };

    let embed = serenity::CreateEmbed::new()
        .title(format!("Weather in {location}"))
        .color(0x3498DB)
        .field(
            "Conditions",
            describe_weather(forecast.current.weather_code),
            true,
        )
        .field(
            "Temperature",
            format!("{:.1} °C", forecast.current.temperature_2m),
            true,
        )
        .field(
            "Wind",
            format!("{:.1} km/h", forecast.current.wind_speed_10m),
            true,
        );

    ctx.send(poise::CreateReply::default().embed(embed)).await?;
    Ok(())
}

/// Set a reminder. The bot pings you in this channel when it fires.
#[poise::command(slash_command, guild_only)]
pub async fn remind(
    ctx: Context<'_>,
    #[description = "What to remind you about"] message: String,
    #[description = "When (e.g. '30 minutes', '2 hours', '1 day')"] time: Option<String>,
) -> Result<(), Error> {
    let duration = match &time {
        Some(raw) => match parse_duration(raw) {
            Some(d) => d,
            None => {
                ctx.say(
                    "Invalid time format. Use formats like `30s`, `5 minutes`, `2h`, or `1 day`.",
                )
                .await?;
                return Ok(());
            }
        },
        None => Duration::from_secs(60),
    };

    if duration.as_secs() < 10 {
        ctx.say("Reminder must be at least 10 seconds in the future.")
            .await?;
        return Ok(());
    }
    if duration.as_secs() > 30 * 24 * 60 * 60 {
        ctx.say("Reminder cannot be more than 30 days in the future.")
            .await?;
        return Ok(());
    }

    let user_id = ctx.author().id;
    let channel_id = ctx.channel_id();
    let http = ctx.serenity_context().http.clone();
    let reminder = message.clone();

    tokio::spawn(async move {
        tokio::time::sleep(duration).await;
        let content = format!("{} Reminder: {}", user_id.mention(), reminder);
        if let Err(e) = channel_id
            .send_message(
                &http,
                serenity::CreateMessage::new().content(content).allowed_mentions(
                    serenity::CreateAllowedMentions::new().users(vec![user_id]),
                ),
            )
            .await
        {
            tracing::warn!("failed to deliver reminder: {e}");
        }
    });

    ctx.say(format!(
        "⏰ Got it! I'll remind you in {}.",
        format_duration(duration)
    ))
    .await?;
    Ok(())
}

/// Parse inputs like "30s", "5 minutes", "2h", "1 day".
fn parse_duration(input: &str) -> Option<Duration> {
    let input = input.trim().to_lowercase();
    let split = input.find(|c: char| !c.is_ascii_digit())?;
    let (num, unit) = input.split_at(split);
    let value: u64 = num.trim().parse().ok()?;

    let secs = match unit.trim() {
        "s" | "sec" | "secs" | "second" | "seconds" => value,
        "m" | "min" | "mins" | "minute" | "minutes" => value * 60,
        "h" | "hr" | "hrs" | "hour" | "hours" => value * 3600,
        "d" | "day" | "days" => value * 86_400,
        _ => return None,
    };
    Some(Duration::from_secs(secs))
}

fn format_duration(duration: Duration) -> String {
    let secs = duration.as_secs();
    if secs < 60 {
        format!("{secs} second(s)")
    } else if secs < 3600 {
        format!("{} minute(s)", secs / 60)
    } else if secs < 86_400 {
        format!("{} hour(s)", secs / 3600)
    } else {
        format!("{} day(s)", secs / 86_400)
    }
}
