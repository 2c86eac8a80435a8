use std::sync::Arc;

use actix_cors::Cors;
use actix_web::{get, put, web, App, HttpResponse, HttpServer, Responder};
use log::{error, info};
use serde::Deserialize;

use rs_markov_core::chain::{Chain, FailurePolicy, StartSeed};

use crate::config::ServerConfig;

mod config;

/// Query parameters for the `/v1/generate` endpoint
#[derive(Deserialize)]
struct GenerateParams {
	max_tokens: Option<usize>,
	seed: Option<String> // -> none, random or custom:<text>
}

/// State shared by every worker
struct SharedData {
	chain: Arc<Chain>,
	config: ServerConfig,
}

impl GenerateParams {
	/// Determines the starting window strategy for generation.
	fn start_seed(&self) -> Result<StartSeed, String> {
		match &self.seed {
			None => Ok(StartSeed::Empty),
			Some(s) => StartSeed::parse(s),
		}
	}
}

/// HTTP GET endpoint `/v1/generate`
///
/// Generates text from the chain. `max_tokens` defaults to the configured
/// number of words.
#[get("/v1/generate")]
async fn get_generated(data: web::Data<SharedData>, query: web::Query<GenerateParams>) -> impl Responder {
	let max_tokens = query.max_tokens.unwrap_or(data.config.num_words);

	let start_seed = match query.start_seed() {
		Ok(s) => s,
		Err(e) => return HttpResponse::BadRequest().body(e)
	};

	let (text, elapsed) = data.chain.generate(max_tokens, &start_seed);
	info!("Generated {} words in {:?}", text.split_whitespace().count(), elapsed);
	HttpResponse::Ok().body(text)
}

/// HTTP PUT endpoint `/v1/train`
///
/// The request body is a message to learn from. Answers the number of bytes processed.
#[put("/v1/train")]
async fn put_train(data: web::Data<SharedData>, body: String) -> impl Responder {
	let bytes = data.chain.train(&body);
	HttpResponse::Ok().body(bytes.to_string())
}

#[get("/v1/stats")]
async fn get_stats(data: web::Data<SharedData>) -> impl Responder {
	HttpResponse::Ok().json(data.chain.stats())
}

/// HTTP PUT endpoint `/v1/save`
///
/// Writes a snapshot right away. Encoding and disk I/O run on the blocking pool.
#[put("/v1/save")]
async fn put_save(data: web::Data<SharedData>) -> impl Responder {
	let chain = Arc::clone(&data.chain);
	let state_file = data.config.state_file.clone();

	match web::block(move || chain.save(&state_file)).await {
		Ok(Ok(())) => HttpResponse::Ok().body("State saved"),
		Ok(Err(e)) => {
			error!("Manual save failed: {e}");
			HttpResponse::InternalServerError().body(format!("Failed to save state: {e}"))
		}
		Err(e) => {
			error!("Manual save could not run: {e}");
			HttpResponse::InternalServerError().body("Save task failed")
		}
	}
}

/// Logs the size of the chain on a fixed interval until the server stops.
fn run_stats_ticker(chain: Arc<Chain>, config: &ServerConfig) {
	let period = config.stats_interval;
	actix_web::rt::spawn(async move {
		let mut ticker = actix_web::rt::time::interval(period);
		// The first tick completes immediately
		ticker.tick().await;
		loop {
			ticker.tick().await;
			let stats = chain.stats();
			info!("Markov stats: {} windows, {} suffixes", stats.prefixes, stats.suffixes);
		}
	});
}

/// Main entry point for the server.
///
/// Loads the previous state, optionally trains a corpus, starts the
/// checkpoint task and the stats ticker, then serves the HTTP endpoints.
/// When the server stops, the checkpoint task is stopped and a final
/// snapshot is written.
#[actix_web::main]
async fn main() -> std::io::Result<()> {
	dotenv::dotenv().ok();
	env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

	let config = ServerConfig::from_env()
		.map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidInput, e))?;
	info!("Starting with {:?}", config);

	let chain = Chain::new(config.prefix_len)
		.map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidInput, e))?;
	let chain = Arc::new(chain);
	chain.load(&config.state_file);

	if let Some(corpus) = &config.corpus {
		if let Err(e) = chain.train_file(corpus) {
			error!("Cannot train corpus: {e}");
		}
	}

	let checkpoints = chain
		.run_periodic_save(config.checkpoint_interval, config.state_file.clone(), FailurePolicy::Continue)
		.map_err(std::io::Error::other)?;
	run_stats_ticker(Arc::clone(&chain), &config);

	let bind = config.bind.clone();
	let state_file = config.state_file.clone();
	let shared_data = web::Data::new(SharedData {
		chain: Arc::clone(&chain),
		config,
	});

	let served = HttpServer::new(move || {
		App::new()
			.wrap(Cors::permissive())
			.app_data(shared_data.clone())
			.service(get_generated)
			.service(put_train)
			.service(get_stats)
			.service(put_save)
	})
		.bind(bind)?
		.run()
		.await;

	checkpoints.stop();
	match chain.save(&state_file) {
		Ok(()) => info!("Final state saved to '{}'", state_file.display()),
		Err(e) => error!("Final save failed: {e}"),
	}

	served
}

#[cfg(test)]
mod tests {
	use super::*;
	use actix_web::test;

	fn shared(chain: Chain) -> web::Data<SharedData> {
		web::Data::new(SharedData {
			chain: Arc::new(chain),
			config: ServerConfig::default(),
		})
	}

	#[actix_web::test]
	async fn train_then_generate() {
		let data = shared(Chain::new(2).unwrap());
		let app = test::init_service(
			App::new().app_data(data.clone()).service(put_train).service(get_generated).service(get_stats),
		)
		.await;

		let req = test::TestRequest::put().uri("/v1/train").set_payload("the quick brown fox").to_request();
		let body = test::call_and_read_body(&app, req).await;
		assert_eq!(body, "19");

		let req = test::TestRequest::get().uri("/v1/generate?max_tokens=3").to_request();
		let body = test::call_and_read_body(&app, req).await;
		assert_eq!(body, "the quick brown");

		let req = test::TestRequest::get().uri("/v1/generate?seed=custom:quick%20brown").to_request();
		let body = test::call_and_read_body(&app, req).await;
		assert_eq!(body, "fox");

		let req = test::TestRequest::get().uri("/v1/stats").to_request();
		let stats: serde_json::Value = test::call_and_read_body_json(&app, req).await;
		assert_eq!(stats["prefixes"], 4);
		assert_eq!(stats["suffixes"], 4);
	}

	#[actix_web::test]
	async fn bad_seed_is_rejected() {
		let data = shared(Chain::new(2).unwrap());
		let app = test::init_service(App::new().app_data(data).service(get_generated)).await;

		let req = test::TestRequest::get().uri("/v1/generate?seed=sideways").to_request();
		let resp = test::call_service(&app, req).await;
		assert_eq!(resp.status(), actix_web::http::StatusCode::BAD_REQUEST);
	}

	#[actix_web::test]
	async fn save_writes_state_file() {
		let dir = tempfile::tempdir().expect("create tempdir");
		let chain = Chain::new(2).unwrap();
		chain.train("hello world");
		let data = web::Data::new(SharedData {
			chain: Arc::new(chain),
			config: ServerConfig { state_file: dir.path().join("state.gz"), ..ServerConfig::default() },
		});
		let app = test::init_service(App::new().app_data(data).service(put_save)).await;

		let req = test::TestRequest::put().uri("/v1/save").to_request();
		let resp = test::call_service(&app, req).await;
		assert!(resp.status().is_success());

		let restored = Chain::new(2).unwrap();
		assert!(restored.load(dir.path().join("state.gz")));
		assert_eq!(restored.successors(" hello"), vec!["world"]);
	}

	#[actix_web::test]
	async fn save_reports_unwritable_state_file() {
		let dir = tempfile::tempdir().expect("create tempdir");
		let data = web::Data::new(SharedData {
			chain: Arc::new(Chain::new(2).unwrap()),
			config: ServerConfig {
				state_file: dir.path().join("missing").join("state.gz"),
				..ServerConfig::default()
			},
		});
		let app = test::init_service(App::new().app_data(data).service(put_save)).await;

		let req = test::TestRequest::put().uri("/v1/save").to_request();
		let resp = test::call_service(&app, req).await;
		assert_eq!(resp.status(), actix_web::http::StatusCode::INTERNAL_SERVER_ERROR);
	}
}
