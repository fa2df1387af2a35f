use mojdomek_home_api::adapters::mojdomek_http::{
    AccountClient, DEFAULT_API_URL, MojDomekHttpClient, validate,
};
use mojdomek_home_api::domain::account::AccountSnapshot;
use mojdomek_home_api::domain::sensors::{describe_locations, project};

fn main() {
    let Some(api_id) = std::env::var("MOJDOMEK_API_ID")
        .ok()
        .filter(|value| !value.trim().is_empty())
    else {
        println!("MOJDOMEK_API_ID not set, nothing to probe");
        std::process::exit(2);
    };
    let api_url = std::env::var("MOJDOMEK_API_URL").unwrap_or_else(|_| DEFAULT_API_URL.to_string());

    let client = match MojDomekHttpClient::new(&api_url) {
        Ok(client) => client,
        Err(err) => {
            println!("ERROR: could not build HTTP client: {err}");
            std::process::exit(1);
        }
    };

    let result = actix_web::rt::System::new().block_on(async {
        let valid = validate(&client, api_id.trim()).await;
        println!("Account valid: {}", yes_no(valid));
        client.fetch(api_id.trim()).await
    });

    match result {
        Ok(snapshot) => print_snapshot(&snapshot),
        Err(err) => {
            println!("ERROR: fetch failed ({:?}): {err}", err.kind());
            std::process::exit(1);
        }
    }
}

fn print_snapshot(snapshot: &AccountSnapshot) {
    println!(
        "Account: {} | active: {} | locations: {}",
        snapshot.display_name().trim(),
        yes_no(snapshot.active),
        snapshot.locations.len()
    );

    let readings = project(snapshot);
    for view in describe_locations(snapshot) {
        println!();
        println!(
            "[{}] {} ({} / {})",
            view.device.identifier, view.device.name, view.device.model, view.device.sw_version
        );
        println!(
            "  Address: {}, {} | max: {} | alarm: {} | direction: {} | tank: {}",
            view.attributes.address.as_deref().unwrap_or("-"),
            view.attributes.town.as_deref().unwrap_or("-"),
            optional_number(view.attributes.max_capacity),
            optional_number(view.attributes.alarm_level),
            view.attributes.direction.as_deref().unwrap_or("-"),
            view.attributes.tank_type.as_deref().unwrap_or("-"),
        );

        for reading in readings
            .iter()
            .filter(|reading| reading.location_id == view.device.identifier)
        {
            let unit = reading.unit.map(|unit| unit.symbol()).unwrap_or_default();
            let marker = if reading.value.is_unknown() { " (!)" } else { "" };
            println!("  {:<24} {}{unit}{marker}", reading.name, reading.value);
        }
    }
}

fn optional_number(value: Option<f64>) -> String {
    value.map_or_else(|| "-".to_string(), |number| number.to_string())
}

fn yes_no(value: bool) -> &'static str {
    if value { "yes" } else { "no" }
}
