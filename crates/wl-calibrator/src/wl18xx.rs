//! wl18xx production line test commands (`wl18xx_plt` section)
//!
//! The wl18xx firmware takes its PHY tests through the same `CMD_TEST`
//! envelope as wl12xx, with its own test id range.

use bytes::BufMut;
use wl_chip::band::Band;
use wl_chip::testmode::wl18xx as test;

use crate::args::{expect_exact, parse_num, parse_signed};
use crate::commands::Context;
use crate::error::{CalError, Result};
use crate::plt::RxStats;

/// Highest bandwidth index the PHY accepts
const MAX_BANDWIDTH: u8 = 4;

/// `wl18xx_plt tune_channel <channel> <band> <bandwidth>`
pub(crate) fn tune_channel(ctx: &mut Context<'_>, args: &[&str]) -> Result<()> {
    expect_exact(args, 3)?;
    let channel: u8 = parse_num(args[0], "channel")?;
    let raw_band: u8 = parse_num(args[1], "band")?;
    let bandwidth: u8 = parse_num(args[2], "bandwidth")?;

    let band = Band::from_raw(raw_band)
        .ok_or_else(|| CalError::usage(format!("Invalid band: {raw_band}")))?;
    if !band.valid_channel(channel) {
        return Err(CalError::usage(format!("Channel {channel} is not valid on band {raw_band}")));
    }
    if bandwidth > MAX_BANDWIDTH {
        return Err(CalError::usage(format!("Invalid bandwidth: {bandwidth}")));
    }

    ctx.fw_test(test::CHANNEL_TUNE, &[channel, band.raw(), bandwidth, 0])
}

/// `wl18xx_plt start_tx <rate> <power> <size> <mode>`
pub(crate) fn start_tx(ctx: &mut Context<'_>, args: &[&str]) -> Result<()> {
    expect_exact(args, 4)?;

    let mut params = Vec::<u8>::with_capacity(12);
    params.put_u32_le(parse_num(args[0], "rate")?);
    params.put_i32_le(parse_signed(args[1], "power")?);
    params.put_u16_le(parse_num(args[2], "size")?);
    params.put_u8(parse_num(args[3], "mode")?);
    params.put_u8(0);

    ctx.fw_test(test::START_TX, &params)
}

/// `wl18xx_plt stop_tx`
pub(crate) fn stop_tx(ctx: &mut Context<'_>, args: &[&str]) -> Result<()> {
    expect_exact(args, 0)?;
    ctx.fw_test(test::STOP_TX, &[])
}

/// `wl18xx_plt start_rx`
pub(crate) fn start_rx(ctx: &mut Context<'_>, args: &[&str]) -> Result<()> {
    expect_exact(args, 0)?;
    ctx.fw_test(test::START_RX, &[])
}

/// `wl18xx_plt stop_rx`
pub(crate) fn stop_rx(ctx: &mut Context<'_>, args: &[&str]) -> Result<()> {
    expect_exact(args, 0)?;
    ctx.fw_test(test::STOP_RX, &[])
}

/// `wl18xx_plt get_rx_stats`
pub(crate) fn get_rx_stats(ctx: &mut Context<'_>, args: &[&str]) -> Result<()> {
    expect_exact(args, 0)?;
    let answer = ctx.fw_query(test::GET_RX_STATS, &[])?;
    let stats = RxStats::parse(&answer.params)?;
    write!(ctx.out, "{stats}")?;
    Ok(())
}

/// `wl18xx_plt tx_tone_start <mode> <offset>`
pub(crate) fn tx_tone_start(ctx: &mut Context<'_>, args: &[&str]) -> Result<()> {
    expect_exact(args, 2)?;
    let mode: u8 = parse_num(args[0], "tone mode")?;
    let offset: i8 = parse_signed(args[1], "offset")?;
    ctx.fw_test(test::TX_TONE_START, &[mode, offset.to_le_bytes()[0], 0, 0])
}

/// `wl18xx_plt tx_tone_stop`
pub(crate) fn tx_tone_stop(ctx: &mut Context<'_>, args: &[&str]) -> Result<()> {
    expect_exact(args, 0)?;
    ctx.fw_test(test::TX_TONE_STOP, &[])
}

/// `wl18xx_plt set_antenna_mode_24g <mode>`
pub(crate) fn set_antenna_mode_24g(ctx: &mut Context<'_>, args: &[&str]) -> Result<()> {
    antenna_mode(ctx, args, test::ANTENNA_MODE_24G)
}

/// `wl18xx_plt set_antenna_mode_5g <mode>`
pub(crate) fn set_antenna_mode_5g(ctx: &mut Context<'_>, args: &[&str]) -> Result<()> {
    antenna_mode(ctx, args, test::ANTENNA_MODE_5G)
}

fn antenna_mode(ctx: &mut Context<'_>, args: &[&str], test_id: u8) -> Result<()> {
    expect_exact(args, 1)?;
    let mode: u8 = parse_num(args[0], "antenna mode")?;
    ctx.fw_test(test_id, &[mode, 0, 0, 0])
}
