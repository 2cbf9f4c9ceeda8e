use std::str::FromStr;
use std::sync::Arc;

use alloy::primitives::{Address, U256};
use anyhow::{Context, Result};
use clap::{Arg, Command};
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use mevshield::config::ShieldConfig;
use mevshield::core::ShieldCore;
use mevshield::mocks::{MockBridgeQuoteProvider, MockChainDataProvider, MockSwapHistoryProvider};
use mevshield::providers::StaticPolicyProvider;
use mevshield::types::{Chain, ReservePair, TradeIntent};

#[tokio::main]
async fn main() -> Result<()> {
    let matches = Command::new("mevshield")
        .version("0.1.0")
        .author("MEVShield Team <team@mevshield.dev>")
        .about("🛡️ 샌드위치 위험 평가 + 실행 계획 엔진")
        .arg(
            Arg::new("config")
                .short('c')
                .long("config")
                .value_name("FILE")
                .help("설정 파일 경로"),
        )
        .arg(
            Arg::new("log-level")
                .short('l')
                .long("log-level")
                .value_name("LEVEL")
                .help("로그 레벨 (trace, debug, info, warn, error)")
                .default_value("info"),
        )
        .arg(
            Arg::new("amount-eth")
                .long("amount-eth")
                .value_name("ETH")
                .help("평가할 거래 크기 (ETH)")
                .default_value("20"),
        )
        .arg(
            Arg::new("offline")
                .long("offline")
                .help("오프라인 데모 모드 (시드된 mock 데이터 사용)")
                .action(clap::ArgAction::SetTrue),
        )
        .get_matches();

    // 로깅 초기화
    let log_level = matches.get_one::<String>("log-level").unwrap();
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| log_level.as_str().into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    print_banner();

    // 환경 변수 로드 (.env 있으면)
    let _ = dotenvy::dotenv();

    // 설정 로드
    let config = match matches.get_one::<String>("config") {
        Some(path) => {
            info!("📋 설정 파일 로드 중: {}", path);
            ShieldConfig::load(path)
                .await
                .with_context(|| format!("failed to load config from {path}"))?
        }
        None => {
            info!("📋 기본 설정 사용");
            ShieldConfig::default()
        }
    };

    if !matches.get_flag("offline") {
        warn!("🔌 라이브 수급자 미연결 - 현재 빌드는 오프라인 데모만 지원합니다 (--offline)");
    }

    // 오프라인 데모: 시드된 mock 수급자로 전체 파이프라인을 돌린다
    let amount_eth: u64 = matches
        .get_one::<String>("amount-eth")
        .unwrap()
        .parse()
        .context("--amount-eth must be an integer")?;

    let (chain_data, intent) = seed_demo_market(amount_eth)?;

    let core = ShieldCore::new(
        Arc::new(config),
        chain_data,
        Arc::new(MockSwapHistoryProvider::new(Vec::new())),
        Arc::new(MockBridgeQuoteProvider::default_routes()),
        Arc::new(StaticPolicyProvider::default()),
    );

    let assessment = core.assess(intent).await;

    info!("🎯 전략: {}", assessment.strategy);
    println!("{}", serde_json::to_string_pretty(&assessment)?);

    Ok(())
}

/// 데모 시장: 1,000,000 USDC / 500 ETH 풀, 30 gwei, ETH $2,500
fn seed_demo_market(amount_eth: u64) -> Result<(Arc<MockChainDataProvider>, TradeIntent)> {
    let weth = Address::from_str(mevshield::constants::WETH)?;
    let usdc = Address::from_str(mevshield::constants::USDC)?;
    let pool = Address::repeat_byte(0x77);

    let eth_unit = U256::from(10u64).pow(U256::from(18u64));
    let usdc_unit = U256::from(10u64).pow(U256::from(6u64));

    let chain_data = Arc::new(MockChainDataProvider::mainnet_defaults());
    chain_data.set_pair_address(Chain::Ethereum, weth, usdc, pool);
    chain_data.set_reserves(
        Chain::Ethereum,
        pool,
        ReservePair::new(
            U256::from(500u64) * eth_unit,
            U256::from(1_000_000u64) * usdc_unit,
        ),
    );
    chain_data.set_token_price(Chain::Ethereum, weth, 2_500.0);
    chain_data.set_token_decimals(Chain::Ethereum, weth, 18);

    let intent = TradeIntent {
        trader: Address::repeat_byte(0xEE),
        token_in: weth,
        token_out: usdc,
        amount_in: U256::from(amount_eth) * eth_unit,
        chain: Chain::Ethereum,
    };

    Ok((chain_data, intent))
}

fn print_banner() {
    println!(
        r#"
    ███╗   ███╗███████╗██╗   ██╗███████╗██╗  ██╗██╗███████╗██╗     ██████╗
    ████╗ ████║██╔════╝██║   ██║██╔════╝██║  ██║██║██╔════╝██║     ██╔══██╗
    ██╔████╔██║█████╗  ██║   ██║███████╗███████║██║█████╗  ██║     ██║  ██║
    ██║╚██╔╝██║██╔══╝  ╚██╗ ██╔╝╚════██║██╔══██║██║██╔══╝  ██║     ██║  ██║
    ██║ ╚═╝ ██║███████╗ ╚████╔╝ ███████║██║  ██║██║███████╗███████╗██████╔╝
    ╚═╝     ╚═╝╚══════╝  ╚═══╝  ╚══════╝╚═╝  ╚═╝╚═╝╚══════╝╚══════╝╚═════╝
                  Sandwich-Risk Estimation & Execution Planning
"#
    );
}
