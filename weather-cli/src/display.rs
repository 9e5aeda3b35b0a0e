use chrono::{DateTime, Local, Utc};
use weather_core::{LocationStore, WeatherRecord};

/// One line per record, in the store's current unit.
pub fn record_line(store: &LocationStore, record: &WeatherRecord) -> String {
    let symbol = store.temperature_symbol();

    format!(
        "[{id}] {location}, {country}: {temp}{symbol} (feels like {feels}{symbol}), {description}, \
         humidity {humidity}%, wind {wind} km/h, updated {updated}",
        id = record.id,
        location = record.location,
        country = record.country,
        temp = store.convert_temperature(record.temperature),
        feels = store.convert_temperature(record.feels_like),
        description = record.description,
        humidity = record.humidity,
        wind = record.wind_speed,
        updated = format_timestamp(record.timestamp),
    )
}

pub fn render_list(store: &LocationStore) -> String {
    if store.records().is_empty() {
        return "No saved locations. Add one with `weather-tracker add <name>`.\n".to_string();
    }

    store
        .records()
        .iter()
        .map(|record| format!("{}\n", record_line(store, record)))
        .collect()
}

fn format_timestamp(millis: i64) -> String {
    DateTime::<Utc>::from_timestamp_millis(millis)
        .map(|utc| utc.with_timezone(&Local).format("%Y-%m-%d %H:%M").to_string())
        .unwrap_or_else(|| "unknown".to_string())
}
