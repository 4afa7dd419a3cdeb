//! CLI smoke entry point.
//!
//! # Responsibility
//! - Verify `datajpa_core` linkage.
//! - Seed an in-memory database and print one page of members so the whole
//!   repository stack can be sanity-checked without a test harness.
//!
//! Pass an absolute directory as the first argument to also write logs there.

use datajpa_core::{
    open_db_in_memory_with_config, CrudRepository, Member, MemberField, MemberRepository,
    PageRequest, PersistenceConfig, Session, Sort, Specification, SpecificationExecutor,
    SqliteMemberRepository, SqliteTeamRepository, Team,
};
use log::info;
use std::error::Error;
use std::process::ExitCode;

fn main() -> ExitCode {
    println!("datajpa_core ping={}", datajpa_core::ping());
    println!("datajpa_core version={}", datajpa_core::core_version());

    match run() {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("error: {err}");
            ExitCode::FAILURE
        }
    }
}

fn run() -> Result<(), Box<dyn Error>> {
    let config = PersistenceConfig::from_env()?;
    if let Some(log_dir) = std::env::args().nth(1) {
        datajpa_core::init_logging_with_config(&config, &log_dir)?;
    }

    let mut conn = open_db_in_memory_with_config(&config)?;
    let session = Session::begin(&mut conn)?;
    {
        let teams = SqliteTeamRepository::try_new(&session)?;
        let members = SqliteMemberRepository::try_new(&session)?;

        let team_a = teams.save(Team::new("teamA"))?;
        let team_b = teams.save(Team::new("teamB"))?;
        for (index, age) in [10, 19, 20, 21, 40].into_iter().enumerate() {
            let team = if index % 2 == 0 { &team_a } else { &team_b };
            members.save(Member::with_team(format!("member{}", index + 1), age, team)?)?;
        }

        let request = PageRequest::of_sorted(0, 3, Sort::desc(MemberField::Age));
        let page = members.find_page(&Specification::all(), &request)?;
        println!(
            "page={} size={} total_elements={} total_pages={} has_next={}",
            page.number, page.size, page.total_elements, page.total_pages, page.has_next
        );
        for member in &page.content {
            println!(
                "member id={:?} username={} age={}",
                member.id, member.username, member.age
            );
        }

        let bumped = members.bulk_age_plus(20)?;
        println!("bulk_age_plus(20) rows={bumped}");
        info!("event=cli_demo module=cli status=ok rows={bumped}");
    }
    session.commit()?;
    Ok(())
}
