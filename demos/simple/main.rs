use experiments::{Callbacks, ExperimentsConfig, Feature};

type Render = fn(&str) -> String;

pub fn main() {
    env_logger::init();

    let config_path = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "tests/data/config.json".to_owned());

    let experiments = ExperimentsConfig::new().to_client();
    experiments.configure_from_file(&config_path).unwrap();

    let buttons: Callbacks<Render> = Callbacks::<Render>::variants()
        .on("variantOne", |label| format!("[{label}] (blue)"))
        .on("variantTwo", |label| format!("[{label}] (green)"))
        .fallback(|label| format!("[{label}]"))
        .into();

    for user_id in [1, 15, 25, 40] {
        let context = experiments.context_for(None, Some(user_id.into()));
        let snapshot = experiments.read_for(&context, None).unwrap();

        let active: Vec<&str> = snapshot.active_features().collect();
        println!("user {user_id}: active features {active:?}");

        // "featureThree" renders a differently colored button per variant.
        let button = experiments
            .protect("featureThree", &snapshot, &buttons, "Checkout")
            .unwrap()
            .unwrap_or_default();
        println!("  button: {button}");

        if experiments.feature("featureTwo", &snapshot).unwrap() == Feature::On {
            println!("  family search enabled");
        }
    }
}
