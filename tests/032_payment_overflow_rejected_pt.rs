#![forbid(unsafe_code)]

use borsh::BorshSerialize;
use solana_program::program_pack::Pack;
use solana_program_test::*;
use solana_sdk::{
    instruction::{AccountMeta, Instruction, InstructionError},
    pubkey::Pubkey,
    signature::{Keypair, Signer},
    system_instruction, system_program,
    transaction::{Transaction, TransactionError},
};
use spl_token::state::{Account as TokenAccount, Mint};

use whitelist_sale::{error::SaleError, instruction::SaleInstruction, pda, state::SaleState};


async fn send_tx(ctx: &mut ProgramTestContext, ixs: Vec<Instruction>, extra_signers: &[&Keypair]) {
    let payer_pk = ctx.payer.pubkey();
    let mut tx = Transaction::new_with_payer(&ixs, Some(&payer_pk));
    let bh = ctx.banks_client.get_latest_blockhash().await.unwrap();

    let mut signers: Vec<&Keypair> = Vec::with_capacity(1 + extra_signers.len());
    signers.push(&ctx.payer);
    signers.extend_from_slice(extra_signers);

    tx.sign(&signers, bh);
    ctx.banks_client.process_transaction(tx).await.unwrap();
}

async fn create_mint(ctx: &mut ProgramTestContext, mint_kp: &Keypair, mint_authority: &Pubkey, decimals: u8) {
    let rent = ctx.banks_client.get_rent().await.unwrap();
    let lamports = rent.minimum_balance(Mint::LEN);

    let create = system_instruction::create_account(
        &ctx.payer.pubkey(),
        &mint_kp.pubkey(),
        lamports,
        Mint::LEN as u64,
        &spl_token::id(),
    );

    let init = spl_token::instruction::initialize_mint(
        &spl_token::id(),
        &mint_kp.pubkey(),
        mint_authority,
        None,
        decimals,
    )
    .unwrap();

    send_tx(ctx, vec![create, init], &[mint_kp]).await;
}

async fn create_token_account(ctx: &mut ProgramTestContext, acct_kp: &Keypair, mint: &Pubkey, owner: &Pubkey) {
    let rent = ctx.banks_client.get_rent().await.unwrap();
    let lamports = rent.minimum_balance(TokenAccount::LEN);

    let create = system_instruction::create_account(
        &ctx.payer.pubkey(),
        &acct_kp.pubkey(),
        lamports,
        TokenAccount::LEN as u64,
        &spl_token::id(),
    );

    let init =
        spl_token::instruction::initialize_account(&spl_token::id(), &acct_kp.pubkey(), mint, owner).unwrap();

    send_tx(ctx, vec![create, init], &[acct_kp]).await;
}

async fn mint_to(ctx: &mut ProgramTestContext, mint: &Pubkey, dst: &Pubkey, mint_authority: &Keypair, amount: u64) {
    let ix = spl_token::instruction::mint_to(
        &spl_token::id(),
        mint,
        dst,
        &mint_authority.pubkey(),
        &[] as &[&Pubkey],
        amount,
    )
    .unwrap();

    send_tx(ctx, vec![ix], &[mint_authority]).await;
}

async fn token_balance(ctx: &mut ProgramTestContext, token_acc: &Pubkey) -> u64 {
    let acc = ctx.banks_client.get_account(*token_acc).await.unwrap().unwrap();
    let ta = TokenAccount::unpack_from_slice(&acc.data).unwrap();
    ta.amount
}

fn mk_ix(program_id: Pubkey, data: Vec<u8>, metas: Vec<AccountMeta>) -> Instruction {
    Instruction { program_id, accounts: metas, data }
}

async fn try_tx(
    ctx: &mut ProgramTestContext,
    ixs: Vec<Instruction>,
    extra_signers: &[&Keypair],
) -> Result<(), BanksClientError> {
    let payer_pk = ctx.payer.pubkey();
    let mut tx = Transaction::new_with_payer(&ixs, Some(&payer_pk));
    let bh = ctx.get_new_latest_blockhash().await.unwrap();

    let mut signers: Vec<&Keypair> = Vec::with_capacity(1 + extra_signers.len());
    signers.push(&ctx.payer);
    signers.extend_from_slice(extra_signers);

    tx.sign(&signers, bh);
    ctx.banks_client.process_transaction(tx).await
}

fn assert_sale_error(err: BanksClientError, expected: SaleError) {
    match err {
        BanksClientError::TransactionError(TransactionError::InstructionError(
            _,
            InstructionError::Custom(code),
        )) => assert_eq!(code, expected as u32),
        other => panic!("unexpected error: {other:?}"),
    }
}

struct SaleFixture {
    authority: Keypair,
    sale_pda: Pubkey,
    token_mint: Pubkey,
    payment_mint: Pubkey,
    mint_auth: Keypair,
    token_vault: Pubkey,
    proceeds_vault: Pubkey,
}

async fn setup_sale(
    ctx: &mut ProgramTestContext,
    program_id: Pubkey,
    price: u64,
    max_per_wallet: u64,
    total_supply: u64,
) -> SaleFixture {
    let authority = Keypair::new();
    let airdrop_ix =
        system_instruction::transfer(&ctx.payer.pubkey(), &authority.pubkey(), 5_000_000_000);
    send_tx(ctx, vec![airdrop_ix], &[]).await;

    let token_mint = Keypair::new();
    let payment_mint = Keypair::new();
    let mint_auth = Keypair::new();
    create_mint(ctx, &token_mint, &mint_auth.pubkey(), 0).await;
    create_mint(ctx, &payment_mint, &mint_auth.pubkey(), 0).await;

    let (sale_pda, _bump) =
        pda::derive_sale_pda(&program_id, &authority.pubkey(), &token_mint.pubkey());

    let token_vault = Keypair::new();
    let proceeds_vault = Keypair::new();
    create_token_account(ctx, &token_vault, &token_mint.pubkey(), &sale_pda).await;
    create_token_account(ctx, &proceeds_vault, &payment_mint.pubkey(), &authority.pubkey()).await;

    mint_to(ctx, &token_mint.pubkey(), &token_vault.pubkey(), &mint_auth, total_supply).await;

    let init_ix = mk_ix(
        program_id,
        SaleInstruction::Initialize { price, max_per_wallet, total_supply }
            .try_to_vec()
            .unwrap(),
        vec![
            AccountMeta::new(authority.pubkey(), true),
            AccountMeta::new(sale_pda, false),
            AccountMeta::new_readonly(token_mint.pubkey(), false),
            AccountMeta::new_readonly(payment_mint.pubkey(), false),
            AccountMeta::new_readonly(token_vault.pubkey(), false),
            AccountMeta::new_readonly(proceeds_vault.pubkey(), false),
            AccountMeta::new_readonly(spl_token::id(), false),
            AccountMeta::new_readonly(system_program::id(), false),
        ],
    );
    send_tx(ctx, vec![init_ix], &[&authority]).await;

    SaleFixture {
        authority,
        sale_pda,
        token_mint: token_mint.pubkey(),
        payment_mint: payment_mint.pubkey(),
        mint_auth,
        token_vault: token_vault.pubkey(),
        proceeds_vault: proceeds_vault.pubkey(),
    }
}

fn whitelist_ix(program_id: Pubkey, fx: &SaleFixture, user: &Pubkey) -> Instruction {
    let (entry_pda, _bump) = pda::derive_whitelist_pda(&program_id, &fx.sale_pda, user);
    mk_ix(
        program_id,
        SaleInstruction::AddToWhitelist.try_to_vec().unwrap(),
        vec![
            AccountMeta::new_readonly(fx.sale_pda, false),
            AccountMeta::new(entry_pda, false),
            AccountMeta::new(fx.authority.pubkey(), true),
            AccountMeta::new_readonly(*user, false),
            AccountMeta::new_readonly(system_program::id(), false),
        ],
    )
}

struct Buyer {
    key: Keypair,
    payment_ata: Pubkey,
    token_ata: Pubkey,
}

async fn setup_buyer(ctx: &mut ProgramTestContext, fx: &SaleFixture, payment_balance: u64) -> Buyer {
    let key = Keypair::new();
    let airdrop_ix =
        system_instruction::transfer(&ctx.payer.pubkey(), &key.pubkey(), 2_000_000_000);
    send_tx(ctx, vec![airdrop_ix], &[]).await;

    let payment_ata = Keypair::new();
    create_token_account(ctx, &payment_ata, &fx.payment_mint, &key.pubkey()).await;
    let token_ata = Keypair::new();
    create_token_account(ctx, &token_ata, &fx.token_mint, &key.pubkey()).await;

    if payment_balance > 0 {
        mint_to(ctx, &fx.payment_mint, &payment_ata.pubkey(), &fx.mint_auth, payment_balance).await;
    }

    Buyer { key, payment_ata: payment_ata.pubkey(), token_ata: token_ata.pubkey() }
}

fn buy_ix(program_id: Pubkey, fx: &SaleFixture, buyer: &Buyer, amount: u64) -> Instruction {
    let (entry_pda, _eb) = pda::derive_whitelist_pda(&program_id, &fx.sale_pda, &buyer.key.pubkey());
    let (record_pda, _rb) = pda::derive_purchase_pda(&program_id, &fx.sale_pda, &buyer.key.pubkey());
    mk_ix(
        program_id,
        SaleInstruction::BuyTokens { amount }.try_to_vec().unwrap(),
        vec![
            AccountMeta::new(fx.sale_pda, false),
            AccountMeta::new_readonly(entry_pda, false),
            AccountMeta::new(record_pda, false),
            AccountMeta::new(buyer.key.pubkey(), true),
            AccountMeta::new(buyer.payment_ata, false),
            AccountMeta::new(fx.proceeds_vault, false),
            AccountMeta::new(fx.token_vault, false),
            AccountMeta::new(buyer.token_ata, false),
            AccountMeta::new_readonly(spl_token::id(), false),
            AccountMeta::new_readonly(system_program::id(), false),
        ],
    )
}

async fn read_sale(ctx: &mut ProgramTestContext, sale_pda: &Pubkey) -> SaleState {
    let acc = ctx.banks_client.get_account(*sale_pda).await.unwrap().unwrap();
    SaleState::unpack(&acc.data).unwrap()
}

#[tokio::test]
async fn payment_overflow_rejected() {
    let program_id = whitelist_sale::id();

    let pt = ProgramTest::new(
        "whitelist_sale",
        program_id,
        processor!(whitelist_sale::entrypoint::process_instruction),
    );

    let mut ctx = pt.start_with_context().await;

    // amount * price would exceed u64; the purchase must fail cleanly
    // instead of wrapping.
    let price = u64::MAX / 2;
    let fx = setup_sale(&mut ctx, program_id, price, 5, 1000).await;

    let buyer = setup_buyer(&mut ctx, &fx, 1_000_000).await;
    let wl = whitelist_ix(program_id, &fx, &buyer.key.pubkey());
    send_tx(&mut ctx, vec![wl], &[&fx.authority]).await;

    let ix = buy_ix(program_id, &fx, &buyer, 3);
    let err = try_tx(&mut ctx, vec![ix], &[&buyer.key]).await.unwrap_err();
    assert_sale_error(err, SaleError::ArithmeticOverflow);

    let sale = read_sale(&mut ctx, &fx.sale_pda).await;
    assert_eq!(sale.total_sold, 0);
    assert_eq!(token_balance(&mut ctx, &fx.token_vault).await, 1000);
    assert_eq!(token_balance(&mut ctx, &buyer.payment_ata).await, 1_000_000);
}
