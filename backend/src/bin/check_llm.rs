//! Utility binary for verifying the chat-completion endpoint and credential
//! This is not part of the main application

use idea2prompt_backend::agent::{AgentInvoker, HttpAgentInvoker, InvokeError};
use idea2prompt_backend::config::Config;
use tokio::time::{timeout, Duration};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    println!("Checking the LLM endpoint from Rust...\n");

    let config = Config::from_env();

    println!("1. Endpoint and models...");
    println!("   URL: {}", config.llm.api_url);
    for (stage, model) in [
        ("evaluation", &config.llm.models.evaluation),
        ("analysis", &config.llm.models.analysis),
        ("architecture", &config.llm.models.architecture),
        ("strategy", &config.llm.models.strategy),
        ("synthesis", &config.llm.models.synthesis),
    ] {
        println!("   {:<12} -> {}", stage, model);
    }

    println!("\n2. Checking for LLM_API_KEY environment variable...");
    if config.llm.api_key.is_empty() {
        eprintln!("   ✗ LLM_API_KEY not found in environment");
        eprintln!("   Make sure to export it: export LLM_API_KEY=\"your-key\"");
        return Err("LLM_API_KEY not set".into());
    }
    println!(
        "   ✓ LLM_API_KEY is set (length: {} chars)",
        config.llm.api_key.len()
    );

    println!("\n3. Sending test request...");
    println!("   Prompt: 'What is 2+2? Answer in one sentence.'");
    let model = config.llm.models.evaluation.clone();
    let invoker = HttpAgentInvoker::new(reqwest::Client::new(), config.llm);

    let call = invoker.invoke(
        &model,
        "You are a concise assistant.",
        "What is 2+2? Answer in one sentence.",
    );
    match timeout(Duration::from_secs(60), call).await {
        Ok(Ok(reply)) => {
            println!("   ✓ Response received ({} chars):", reply.len());
            println!("   {}", reply.trim());
        }
        Ok(Err(InvokeError::Upstream { status, detail })) => {
            eprintln!("   ✗ Endpoint answered HTTP {}", status);
            if let Some(detail) = detail {
                eprintln!("   {}", detail);
            }
            eprintln!("\n   Troubleshooting:");
            eprintln!("   - 401/403: check LLM_API_KEY");
            eprintln!("   - 404: check LLM_API_URL and the model names");
            return Err("upstream error".into());
        }
        Ok(Err(e)) => {
            eprintln!("   ✗ Request failed: {}", e);
            return Err(e.into());
        }
        Err(_) => {
            eprintln!("   ✗ Request timed out after 60 seconds");
            return Err("timeout".into());
        }
    }

    println!("\n✓ All checks completed!");
    Ok(())
}
